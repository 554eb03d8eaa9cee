//! Bindings du service de statut NFe (NFeStatusServico4)
//!
//! Les autres opérations viennent du générateur de bindings, à travers les
//! traits [`FiscalMessage`] et [`WsdlOperation`].

use crate::service::WsdlOperation;
use fiscalsoap::FiscalMessage;
use serde::{Deserialize, Serialize};

/// Pedido de consulta do status do serviço
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsStatServ {
    #[serde(rename = "@versao", alias = "versao")]
    pub versao: String,
    #[serde(rename = "tpAmb")]
    pub tp_amb: String,
    #[serde(rename = "cUF")]
    pub c_uf: String,
    /// Always `STATUS`
    #[serde(rename = "xServ")]
    pub x_serv: String,
}

impl ConsStatServ {
    pub fn new(versao: &str, tp_amb: &str, c_uf: &str) -> Self {
        Self {
            versao: versao.to_string(),
            tp_amb: tp_amb.to_string(),
            c_uf: c_uf.to_string(),
            x_serv: "STATUS".to_string(),
        }
    }
}

impl FiscalMessage for ConsStatServ {
    const TAG: &'static str = "consStatServ";
}

/// Resultado da consulta do status do serviço
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetConsStatServ {
    #[serde(rename = "@versao", alias = "versao")]
    pub versao: String,
    #[serde(rename = "tpAmb")]
    pub tp_amb: String,
    #[serde(rename = "verAplic")]
    pub ver_aplic: String,
    #[serde(rename = "cStat")]
    pub c_stat: String,
    #[serde(rename = "xMotivo")]
    pub x_motivo: String,
    #[serde(rename = "cUF")]
    pub c_uf: String,
    #[serde(rename = "dhRecbto")]
    pub dh_recbto: String,
    /// Tempo médio de resposta, em segundos
    #[serde(rename = "tMed", default, skip_serializing_if = "Option::is_none")]
    pub t_med: Option<String>,
    #[serde(rename = "dhRetorno", default, skip_serializing_if = "Option::is_none")]
    pub dh_retorno: Option<String>,
    #[serde(rename = "xObs", default, skip_serializing_if = "Option::is_none")]
    pub x_obs: Option<String>,
}

impl RetConsStatServ {
    /// `107`: serviço em operação
    pub fn is_in_operation(&self) -> bool {
        self.c_stat == "107"
    }
}

impl FiscalMessage for RetConsStatServ {
    const TAG: &'static str = "retConsStatServ";
}

/// `nfeStatusServicoNF`, homologation endpoint of SVRS
pub struct NfeStatusServico4;

impl WsdlOperation for NfeStatusServico4 {
    type Input = ConsStatServ;
    type Output = RetConsStatServ;

    const NAME: &'static str = "nfeStatusServicoNF";
    const LOCATION: &'static str =
        "https://nfe-homologacao.svrs.rs.gov.br/ws/NfeStatusServico/NfeStatusServico4.asmx";
    const NAMESPACE: &'static str = "http://www.portalfiscal.inf.br/nfe/wsdl/NFeStatusServico4";
    const SOAP_ACTION: &'static str =
        "http://www.portalfiscal.inf.br/nfe/wsdl/NFeStatusServico4/nfeStatusServicoNF";
}

//! Codes d'environnement, d'UF (IBGE) et de service

use crate::error::FiscalError;
use std::fmt;
use std::str::FromStr;

/// Ambiente (`tpAmb`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Production,
    Homologation,
}

impl Environment {
    pub const ALL: [Environment; 2] = [Environment::Production, Environment::Homologation];

    pub fn code(self) -> &'static str {
        match self {
            Environment::Production => "1",
            Environment::Homologation => "2",
        }
    }
}

impl FromStr for Environment {
    type Err = FiscalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Environment::Production),
            "2" => Ok(Environment::Homologation),
            other => Err(FiscalError::configuration(format!(
                "invalid environment `{other}`, expected \"1\" (production) or \"2\" (homologation)"
            ))),
        }
    }
}

impl AsRef<str> for Environment {
    fn as_ref(&self) -> &str {
        self.code()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

macro_rules! state_codes {
    ($($variant:ident => ($code:literal, $abbr:literal)),+ $(,)?) => {
        /// Federative unit, identified by its IBGE code
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StateCode {
            $($variant,)+
        }

        impl StateCode {
            pub const ALL: &'static [StateCode] = &[$(StateCode::$variant,)+];

            /// Two-digit IBGE code (`cUF`)
            pub fn code(self) -> &'static str {
                match self {
                    $(StateCode::$variant => $code,)+
                }
            }

            pub fn abbreviation(self) -> &'static str {
                match self {
                    $(StateCode::$variant => $abbr,)+
                }
            }

            /// Looks a state up by its abbreviation (`SC`, `rs`...)
            pub fn from_abbreviation(abbr: &str) -> Result<Self, FiscalError> {
                match abbr.trim().to_ascii_uppercase().as_str() {
                    $($abbr => Ok(StateCode::$variant),)+
                    other => Err(FiscalError::configuration(format!(
                        "unknown state abbreviation `{other}`"
                    ))),
                }
            }
        }

        impl FromStr for StateCode {
            type Err = FiscalError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($code => Ok(StateCode::$variant),)+
                    other => Err(FiscalError::configuration(format!(
                        "invalid state code `{other}`, expected a two-digit IBGE code"
                    ))),
                }
            }
        }
    };
}

state_codes! {
    Rondonia => ("11", "RO"),
    Acre => ("12", "AC"),
    Amazonas => ("13", "AM"),
    Roraima => ("14", "RR"),
    Para => ("15", "PA"),
    Amapa => ("16", "AP"),
    Tocantins => ("17", "TO"),
    Maranhao => ("21", "MA"),
    Piaui => ("22", "PI"),
    Ceara => ("23", "CE"),
    RioGrandeDoNorte => ("24", "RN"),
    Paraiba => ("25", "PB"),
    Pernambuco => ("26", "PE"),
    Alagoas => ("27", "AL"),
    Sergipe => ("28", "SE"),
    Bahia => ("29", "BA"),
    MinasGerais => ("31", "MG"),
    EspiritoSanto => ("32", "ES"),
    RioDeJaneiro => ("33", "RJ"),
    SaoPaulo => ("35", "SP"),
    Parana => ("41", "PR"),
    SantaCatarina => ("42", "SC"),
    RioGrandeDoSul => ("43", "RS"),
    MatoGrossoDoSul => ("50", "MS"),
    MatoGrosso => ("51", "MT"),
    Goias => ("52", "GO"),
    DistritoFederal => ("53", "DF"),
}

impl AsRef<str> for StateCode {
    fn as_ref(&self) -> &str {
        self.code()
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Fiscal document family, also the web service family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServiceName {
    #[default]
    Nfe,
    Cte,
    Mdfe,
    Bpe,
}

impl ServiceName {
    pub const ALL: [ServiceName; 4] = [
        ServiceName::Nfe,
        ServiceName::Cte,
        ServiceName::Mdfe,
        ServiceName::Bpe,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceName::Nfe => "nfe",
            ServiceName::Cte => "cte",
            ServiceName::Mdfe => "mdfe",
            ServiceName::Bpe => "bpe",
        }
    }
}

impl FromStr for ServiceName {
    type Err = FiscalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nfe" => Ok(ServiceName::Nfe),
            "cte" => Ok(ServiceName::Cte),
            "mdfe" => Ok(ServiceName::Mdfe),
            "bpe" => Ok(ServiceName::Bpe),
            other => Err(FiscalError::configuration(format!(
                "invalid service `{other}`, expected one of nfe, cte, mdfe, bpe"
            ))),
        }
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

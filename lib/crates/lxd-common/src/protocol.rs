use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire protocol spoken by a remote.
///
/// `lxd` remotes expose the full read/write REST API; `simplestreams` remotes
/// only publish image indexes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Protocol {
    #[default]
    Lxd,
    Simplestreams,
}

impl Protocol {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lxd => "lxd",
            Self::Simplestreams => "simplestreams",
        }
    }

    /// Port used for `https` remotes that do not name one.
    #[must_use]
    pub fn default_https_port(self) -> u16 {
        match self {
            Self::Lxd => 8443,
            Self::Simplestreams => 443,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown protocol '{0}' (expected 'lxd' or 'simplestreams')")]
pub struct UnknownProtocol(pub String);

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "lxd" => Ok(Self::Lxd),
            "simplestreams" => Ok(Self::Simplestreams),
            other => Err(UnknownProtocol(other.to_string())),
        }
    }
}

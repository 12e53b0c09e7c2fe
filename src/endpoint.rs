use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::zfs_types::{DatasetName, SnapshotName};

/// One side of a replication pair, parsed from a command-line operand of the
/// form `[user@]host:dataset[@snapshot]` or `dataset[@snapshot]`.
///
/// The host is whatever precedes the first `:`, provided it contains no `/`.
/// That means `tank:fs` parses as host `tank`, dataset `fs`; a local dataset
/// whose first component contains a colon is not expressible, same as rsync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: Option<String>,
    pub dataset: DatasetName,
    pub snapshot: Option<SnapshotName>,
}

impl Endpoint {
    pub fn is_remote(&self) -> bool {
        self.host.is_some()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            write!(f, "{host}:")?;
        }
        f.write_str(&self.dataset)?;
        if let Some(snapshot) = &self.snapshot {
            write!(f, "@{snapshot}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EndpointParseError {
    #[error("operand is empty")]
    Empty,
    #[error("operand `{0}` contains control characters")]
    ControlCharacters(String),
    #[error("operand `{0}` contains more than one `@`")]
    TooManyAts(String),
    #[error("invalid host `{0}`")]
    InvalidHost(String),
    #[error("invalid dataset path `{0}`")]
    InvalidDataset(String),
    #[error("invalid snapshot name `{0}`")]
    InvalidSnapshot(String),
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(operand: &str) -> Result<Self, Self::Err> {
        if operand.is_empty() {
            return Err(EndpointParseError::Empty);
        }
        if operand.chars().any(char::is_control) {
            return Err(EndpointParseError::ControlCharacters(operand.to_string()));
        }

        let (host, rest) = split_host(operand);
        if let Some(host) = host {
            validate_host(host)?;
        }

        let pieces: Vec<&str> = rest.split('@').collect();
        let (raw_dataset, snapshot) = match pieces.as_slice() {
            [dataset] => (*dataset, None),
            [dataset, snapshot] => (*dataset, Some(*snapshot)),
            _ => return Err(EndpointParseError::TooManyAts(operand.to_string())),
        };

        let dataset = raw_dataset.trim_matches('/');
        validate_dataset(dataset)?;
        if let Some(snapshot) = snapshot {
            validate_snapshot(snapshot)?;
        }

        Ok(Endpoint {
            host: host.map(str::to_string),
            dataset: dataset.to_string(),
            snapshot: snapshot.map(str::to_string),
        })
    }
}

/// Split `host:rest` at the first colon. A colon that comes after a `/`, or
/// an empty prefix, is not a host marker; snapshot names may contain colons
/// so `tank/fs@12:30` stays local.
fn split_host(operand: &str) -> (Option<&str>, &str) {
    match operand.split_once(':') {
        Some((prefix, rest)) if !prefix.is_empty() && !prefix.contains('/') => {
            (Some(prefix), rest)
        }
        _ => (None, operand),
    }
}

fn validate_host(host: &str) -> Result<(), EndpointParseError> {
    let err = || EndpointParseError::InvalidHost(host.to_string());
    // `user@host` keeps the user in the host field; ssh takes it verbatim.
    let (user, name) = match host.split_once('@') {
        Some((user, name)) => (Some(user), name),
        None => (None, host),
    };
    if let Some(user) = user {
        if user.is_empty() || !user.chars().all(valid_host_char) {
            return Err(err());
        }
    }
    if name.is_empty() || name.contains('@') {
        return Err(err());
    }
    // A leading dash would read as an option to the remote shell.
    if host.starts_with('-') || !name.chars().all(valid_host_char) {
        return Err(err());
    }
    Ok(())
}

fn valid_host_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

fn validate_dataset(dataset: &str) -> Result<(), EndpointParseError> {
    let err = || EndpointParseError::InvalidDataset(dataset.to_string());
    if dataset.is_empty() {
        return Err(err());
    }
    for component in dataset.split('/') {
        let mut chars = component.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphanumeric() => {}
            _ => return Err(err()),
        }
        if !chars.all(valid_name_char) {
            return Err(err());
        }
    }
    Ok(())
}

fn validate_snapshot(snapshot: &str) -> Result<(), EndpointParseError> {
    let valid = !snapshot.is_empty() && snapshot.chars().all(valid_name_char);
    if valid {
        Ok(())
    } else {
        Err(EndpointParseError::InvalidSnapshot(snapshot.to_string()))
    }
}

// The ZFS name charset: alphanumerics plus a few separators. Keeping to it
// also keeps every operand boring for the remote shell.
fn valid_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.' | ' ')
}

use core::fmt;

use http::header::HeaderName;

//
//
//
#[derive(Debug, PartialEq, Eq)]
pub enum HeaderError {
    Frozen,
    InvalidName,
    InvalidValue,
}
impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
impl std::error::Error for HeaderError {}
impl From<HeaderError> for std::io::Error {
    fn from(err: HeaderError) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
    }
}

//
//
//
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    key: String,
    name: String,
    values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<Entry>,
    frozen: bool,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|i| &self.entries[i].values[..])
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(|x| x.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), HeaderError> {
        let value = self.check(name, value.into())?;
        match self.position(name) {
            Some(i) => {
                let values = &mut self.entries[i].values;
                values.clear();
                values.push(value);
            }
            None => self.push(name, value),
        }
        Ok(())
    }

    pub fn add(&mut self, name: &str, value: impl Into<String>) -> Result<(), HeaderError> {
        let value = self.check(name, value.into())?;
        match self.position(name) {
            Some(i) => self.entries[i].values.push(value),
            None => self.push(name, value),
        }
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<Option<Vec<String>>, HeaderError> {
        if self.frozen {
            return Err(HeaderError::Frozen);
        }
        Ok(self
            .position(name)
            .map(|i| self.entries.remove(i).values))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), &entry.values[..]))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_token(&self, name: &str, token: &str) -> bool {
        self.get(name)
            .map(|values| {
                values
                    .iter()
                    .flat_map(|value| value.split(','))
                    .any(|x| x.trim().eq_ignore_ascii_case(token))
            })
            .unwrap_or(false)
    }

    //
    pub fn freeze(&mut self) {
        self.frozen = true;
    }
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    //
    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.key.eq_ignore_ascii_case(name))
    }

    fn push(&mut self, name: &str, value: String) {
        self.entries.push(Entry {
            key: name.to_ascii_lowercase(),
            name: canonical_name(name),
            values: vec![value],
        });
    }

    fn check(&self, name: &str, value: String) -> Result<String, HeaderError> {
        if self.frozen {
            return Err(HeaderError::Frozen);
        }
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| HeaderError::InvalidName)?;
        if value.bytes().any(|x| x == b'\r' || x == b'\n' || x == b'\0') {
            return Err(HeaderError::InvalidValue);
        }
        Ok(value)
    }
}

pub fn canonical_name(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let c = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            c
        })
        .collect()
}

use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpPrincipal {
    username: String,
    realm: String,
}

impl HttpPrincipal {
    pub fn new(username: impl Into<String>, realm: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            realm: realm.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// `realm:username`
    pub fn name(&self) -> String {
        format!("{}:{}", self.realm, self.username)
    }
}

impl fmt::Display for HttpPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.realm, self.username)
    }
}

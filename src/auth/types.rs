//! Authentication principal types.

/// Subject of a verified access token.
///
/// The authorization middleware inserts this into the request extensions;
/// protected handlers read it back through the `Authenticated` extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSubject(pub String);

impl AuthenticatedSubject {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

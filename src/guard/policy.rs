//! Route classification for the dashboard guard.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Protected,
}

const DEFAULT_PUBLIC_ROUTES: [&str; 6] = [
    "/login",
    "/verify-otp",
    "/api/auth",
    "/health",
    "/assets",
    "/favicon.ico",
];
const DEFAULT_PROTECTED_ROUTES: [&str; 3] = ["/admin", "/dashboard", "/api"];

/// Public and protected path prefixes. The longest matching prefix decides;
/// unmatched paths are protected.
#[derive(Clone, Debug)]
pub struct RoutePolicy {
    rules: Vec<(String, RouteClass)>,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        let mut policy = Self { rules: Vec::new() };
        for route in DEFAULT_PUBLIC_ROUTES {
            policy = policy.with_public(route);
        }
        for route in DEFAULT_PROTECTED_ROUTES {
            policy = policy.with_protected(route);
        }
        policy
    }
}

impl RoutePolicy {
    /// Policy with the dashboard defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy without any rules; everything is protected.
    #[must_use]
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    #[must_use]
    pub fn with_public(self, prefix: &str) -> Self {
        self.with_rule(prefix, RouteClass::Public)
    }

    #[must_use]
    pub fn with_protected(self, prefix: &str) -> Self {
        self.with_rule(prefix, RouteClass::Protected)
    }

    fn with_rule(mut self, prefix: &str, class: RouteClass) -> Self {
        let prefix = normalize_prefix(prefix);
        if prefix.is_empty() {
            return self;
        }
        // Re-declaring a prefix replaces its class.
        self.rules.retain(|(existing, _)| *existing != prefix);
        self.rules.push((prefix, class));
        self
    }

    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        self.rules
            .iter()
            .filter(|(prefix, _)| matches_prefix(prefix, path))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(RouteClass::Protected, |(_, class)| *class)
    }

    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.classify(path) == RouteClass::Public
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let with_slash = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    if with_slash == "/" {
        with_slash
    } else {
        with_slash.trim_end_matches('/').to_string()
    }
}

// `/login` covers `/login` and `/login/...` but not `/loginx`; `/` covers only `/`.
fn matches_prefix(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return path == "/";
    }
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

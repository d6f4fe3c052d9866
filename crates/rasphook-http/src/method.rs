use std::fmt;

/// HTTP verbs a script may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Head,
    Options,
    Delete,
}

impl HttpMethod {
    /// Case-insensitive lookup; unrecognized names fall back to GET.
    pub fn from_config(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "get" => HttpMethod::Get,
            "post" => HttpMethod::Post,
            "put" => HttpMethod::Put,
            "patch" => HttpMethod::Patch,
            "head" => HttpMethod::Head,
            "options" => HttpMethod::Options,
            "delete" => HttpMethod::Delete,
            _ => HttpMethod::Get,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_is_case_insensitive() {
        assert_eq!(HttpMethod::from_config("post"), HttpMethod::Post);
        assert_eq!(HttpMethod::from_config("PoSt"), HttpMethod::Post);
        assert_eq!(HttpMethod::from_config("DELETE"), HttpMethod::Delete);
        assert_eq!(HttpMethod::from_config("options"), HttpMethod::Options);
    }

    #[test]
    fn test_unknown_methods_fall_back_to_get() {
        assert_eq!(HttpMethod::from_config("TRACE"), HttpMethod::Get);
        assert_eq!(HttpMethod::from_config(""), HttpMethod::Get);
        assert_eq!(HttpMethod::default(), HttpMethod::Get);
    }

    #[test]
    fn test_reqwest_mapping() {
        assert_eq!(HttpMethod::Patch.to_reqwest(), reqwest::Method::PATCH);
        assert_eq!(HttpMethod::Head.to_string(), "HEAD");
    }
}

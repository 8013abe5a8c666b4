//! HTTP verbs supported by the Kyrazo API.

use strum::{Display, EnumIter, EnumString};

/// HTTP methods the executor can issue.
///
/// ## Examples
///
/// ```rust
/// use kyrazo::HttpMethod;
///
/// let parsed: HttpMethod = "PATCH".parse().unwrap();
/// assert_eq!(parsed, HttpMethod::Patch);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_display() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!("Put".parse::<HttpMethod>().unwrap(), HttpMethod::Put);
        assert!("HEAD".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_into_reqwest_keeps_names() {
        for method in HttpMethod::iter() {
            assert_eq!(reqwest::Method::from(method).as_str(), method.to_string());
        }
    }
}

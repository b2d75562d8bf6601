/// Compiles a literal pattern once and hands out the shared instance.
macro_rules! lazy_regex {
    ($pattern:expr) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        #[allow(clippy::expect_used)]
        let re = RE.get_or_init(|| regex::Regex::new($pattern).expect("literal regex pattern"));
        re
    }};
}

pub(crate) use lazy_regex;

pub mod datetime;
pub mod logging;
pub mod validation;

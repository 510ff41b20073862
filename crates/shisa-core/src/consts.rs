use const_format::concatcp;

pub const PROJECT_IDENTIFIER: &str = const {
    const FALLBACK_NAME: &str = "shisa";

    if let Some(package_name) = option_env!("CARGO_PRIMARY_PACKAGE") {
        package_name
    } else {
        FALLBACK_NAME
    }
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const USER_AGENT: &str = concatcp!(PROJECT_IDENTIFIER, "/", VERSION);

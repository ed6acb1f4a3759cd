use clap::Parser;
use pantry_core::CatalogSettings;
use std::net::SocketAddr;

/// Recipe catalog server.
#[derive(Debug, Parser)]
#[command(name = "pantry-server", version, about)]
pub struct Config {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Address to listen on
    #[arg(long, env = "PANTRY_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Minimum match percentage when an ingredient search names none
    #[arg(long, env = "PANTRY_DEFAULT_MATCH_THRESHOLD", default_value_t = 70)]
    pub default_match_threshold: u8,

    /// Serving count budget searches scale to when none is given
    #[arg(long, env = "PANTRY_DEFAULT_SERVINGS", default_value_t = 4)]
    pub default_servings: i32,

    /// Page size when a search names none
    #[arg(long, env = "PANTRY_DEFAULT_PER_PAGE", default_value_t = 20)]
    pub default_per_page: u32,

    /// Report each request's store query count in an X-DB-Query-Count header
    #[arg(
        long,
        env = "TRACK_DB_QUERY_COUNT",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub track_db_query_count: bool,

    /// Print the OpenAPI document and exit
    #[arg(long)]
    pub openapi: bool,
}

impl Config {
    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            default_per_page: self.default_per_page,
            default_match_threshold: self.default_match_threshold,
            default_servings: self.default_servings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    /// Declared defaults, read off the command so PANTRY_* variables in the
    /// test environment can't mask them.
    fn default_of(id: &str) -> Vec<String> {
        let mut command = Config::command();
        command.build();
        let arg = command
            .get_arguments()
            .find(|arg| arg.get_id() == id)
            .unwrap();
        arg.get_default_values()
            .iter()
            .map(|value| value.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = CatalogSettings::default();
        assert_eq!(default_of("bind"), ["0.0.0.0:3000"]);
        assert_eq!(
            default_of("default_match_threshold"),
            [settings.default_match_threshold.to_string()]
        );
        assert_eq!(
            default_of("default_servings"),
            [settings.default_servings.to_string()]
        );
        assert_eq!(
            default_of("default_per_page"),
            [settings.default_per_page.to_string()]
        );
        assert_eq!(default_of("openapi"), ["false"]);
    }

    #[test]
    fn test_overrides() {
        let config = Config::try_parse_from([
            "pantry-server",
            "--bind",
            "127.0.0.1:8080",
            "--default-match-threshold",
            "50",
            "--default-servings",
            "2",
            "--default-per-page",
            "10",
            "--openapi",
            "--track-db-query-count",
        ])
        .unwrap();
        let settings = config.catalog_settings();
        assert_eq!(settings.default_match_threshold, 50);
        assert_eq!(settings.default_servings, 2);
        assert_eq!(settings.default_per_page, 10);
        assert!(config.openapi);
        assert!(config.track_db_query_count);
    }

    #[test]
    fn test_threshold_must_fit() {
        assert!(Config::try_parse_from(["pantry-server", "--default-match-threshold", "300"]).is_err());
    }
}

//! Units of work: one year each

use crate::config::FetchConfig;

/// One year to fetch, with its derived endpoint and artifact name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitTask {
    pub year: u16,
    /// `<base_url>/data/all/<year>`
    pub endpoint: String,
    /// `data_all_<year>.json`
    pub artifact: String,
}

impl UnitTask {
    pub fn new(base_url: &str, year: u16) -> Self {
        Self {
            year,
            endpoint: format!("{}/data/all/{year}", base_url.trim_end_matches('/')),
            artifact: artifact_name(year),
        }
    }

    /// One task per configured year, in worklist order
    pub fn worklist(config: &FetchConfig) -> Vec<Self> {
        config
            .years
            .iter()
            .map(|&year| Self::new(&config.base_url, year))
            .collect()
    }
}

/// Artifact file name for a year
pub fn artifact_name(year: u16) -> String {
    format!("data_all_{year}.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_endpoint_and_artifact() {
        let task = UnitTask::new("https://api.example.org/v1", 2010);
        assert_eq!(task.endpoint, "https://api.example.org/v1/data/all/2010");
        assert_eq!(task.artifact, "data_all_2010.json");
    }

    #[test]
    fn trailing_slash_not_doubled() {
        let task = UnitTask::new("http://localhost:8080/", 2000);
        assert_eq!(task.endpoint, "http://localhost:8080/data/all/2000");
    }

    #[test]
    fn worklist_preserves_order() {
        let mut config = FetchConfig::new("http://x", "k", "/tmp");
        config.years = vec![2003, 2001, 2002];
        let years: Vec<u16> = UnitTask::worklist(&config).iter().map(|t| t.year).collect();
        assert_eq!(years, vec![2003, 2001, 2002]);
    }
}

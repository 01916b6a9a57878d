use anyhow::Context;
use serde::Serialize;

/// A bookable service and its price per day, in whole currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceOffer {
    pub name: String,
    pub daily_rate: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCatalog {
    offers: Vec<ServiceOffer>,
}

impl Default for ServiceCatalog {
    fn default() -> Self {
        Self::new([
            ("Day Care", 30),
            ("Overnight Stay", 50),
            ("Grooming", 40),
            ("Pet Walking", 25),
        ])
    }
}

impl ServiceCatalog {
    pub fn new<'a>(offers: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        Self {
            offers: offers
                .into_iter()
                .map(|(name, daily_rate)| ServiceOffer {
                    name: name.to_string(),
                    daily_rate,
                })
                .collect(),
        }
    }

    /// Parses `Name=rate,Name=rate`.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let mut offers = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, rate) = entry
                .split_once('=')
                .with_context(|| format!("catalog entry {entry:?} is not Name=rate"))?;
            let name = name.trim();
            anyhow::ensure!(!name.is_empty(), "catalog entry {entry:?} has no name");
            let daily_rate: i64 = rate
                .trim()
                .parse()
                .with_context(|| format!("catalog rate for {name:?} is not a number"))?;
            anyhow::ensure!(daily_rate > 0, "catalog rate for {name:?} must be positive");
            offers.push(ServiceOffer {
                name: name.to_string(),
                daily_rate,
            });
        }
        anyhow::ensure!(!offers.is_empty(), "service catalog is empty");
        Ok(Self { offers })
    }

    /// Case-insensitive lookup by service name.
    pub fn find(&self, name: &str) -> Option<&ServiceOffer> {
        let name = name.trim();
        self.offers
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
    }

    pub fn offers(&self) -> &[ServiceOffer] {
        &self.offers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_rates() {
        let c = ServiceCatalog::default();
        assert_eq!(c.find("Day Care").unwrap().daily_rate, 30);
        assert_eq!(c.find("overnight stay").unwrap().daily_rate, 50);
        assert_eq!(c.find(" Grooming ").unwrap().name, "Grooming");
        assert!(c.find("Cat Sitting").is_none());
        assert_eq!(c.offers().len(), 4);
    }

    #[test]
    fn parses_env_catalog() {
        let c = ServiceCatalog::parse("Puppy Class=35, Day Care = 28,").unwrap();
        assert_eq!(c.find("puppy class").unwrap().daily_rate, 35);
        assert_eq!(c.find("Day Care").unwrap().daily_rate, 28);
    }

    #[test]
    fn rejects_bad_catalog() {
        assert!(ServiceCatalog::parse("Day Care").is_err());
        assert!(ServiceCatalog::parse("Day Care=abc").is_err());
        assert!(ServiceCatalog::parse("Day Care=0").is_err());
        assert!(ServiceCatalog::parse("=10").is_err());
        assert!(ServiceCatalog::parse(" , ").is_err());
    }
}

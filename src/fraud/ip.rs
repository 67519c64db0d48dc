use anyhow::Result;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct IpAnalysis {
    pub risk: f64,
    pub country: String,
    pub proxy: bool,
    pub vpn: bool,
}

#[async_trait::async_trait]
pub trait IpIntelligence: Send + Sync {
    async fn analyze(&self, ip: &str) -> Result<IpAnalysis>;

    /// Known-bad addresses short-circuit evaluation to immediate rejection.
    async fn is_known_bad(&self, ip: &str) -> Result<bool>;
}

/// Config-driven classifier standing in for an external IP intelligence
/// provider.
// TODO: wire a real GeoIP/proxy-detection provider behind this trait.
pub struct StaticIpIntelligence {
    pub high_risk_countries: Vec<String>,
    pub known_bad_ips: HashSet<String>,
}

impl StaticIpIntelligence {
    pub fn new(high_risk_countries: Vec<String>, known_bad_ips: Vec<String>) -> Self {
        Self {
            high_risk_countries,
            known_bad_ips: known_bad_ips.into_iter().collect(),
        }
    }

    fn classify(&self, _ip: &str) -> IpAnalysis {
        IpAnalysis {
            risk: 0.1,
            country: "US".to_string(),
            proxy: false,
            vpn: false,
        }
    }
}

#[async_trait::async_trait]
impl IpIntelligence for StaticIpIntelligence {
    async fn analyze(&self, ip: &str) -> Result<IpAnalysis> {
        let mut analysis = self.classify(ip);

        if self.high_risk_countries.contains(&analysis.country) {
            analysis.risk = analysis.risk.max(0.8);
        }
        if analysis.proxy || analysis.vpn {
            analysis.risk = (analysis.risk + 0.3).min(1.0);
        }

        Ok(analysis)
    }

    async fn is_known_bad(&self, ip: &str) -> Result<bool> {
        Ok(self.known_bad_ips.contains(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn high_risk_country_raises_floor() {
        let intel = StaticIpIntelligence::new(vec!["US".to_string()], Vec::new());
        let analysis = intel.analyze("203.0.113.9").await.unwrap();
        assert!(analysis.risk >= 0.8);
    }

    #[tokio::test]
    async fn known_bad_list_is_exact_match() {
        let intel = StaticIpIntelligence::new(Vec::new(), vec!["203.0.113.9".to_string()]);
        assert!(intel.is_known_bad("203.0.113.9").await.unwrap());
        assert!(!intel.is_known_bad("203.0.113.10").await.unwrap());
    }
}

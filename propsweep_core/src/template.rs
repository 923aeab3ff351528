//! Configuration templating.
//!
//! Renders the simulator's settings class from a [`ParameterTuple`]. The
//! field names are compiled against by the simulator and must not change.

use crate::error::SweepError;
use crate::params::ParameterTuple;
use serde::{Deserialize, Serialize};

/// File name of the rendered configuration artifact.
pub const CONFIG_FILE_NAME: &str = "ProposalConfiguration.java";

/// Fixed connection limits of every simulated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeLimits {
    /// Maximum outbound connections
    pub max_outbound: u32,

    /// Maximum inbound connections
    pub max_inbound: u32,
}

impl Default for DegreeLimits {
    fn default() -> Self {
        Self {
            max_outbound: 8,
            max_inbound: 8,
        }
    }
}

/// A rendered configuration, ready to be written into a workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    tuple: ParameterTuple,
    source: String,
}

impl RunConfiguration {
    /// Tuple this configuration was rendered from.
    pub fn tuple(&self) -> &ParameterTuple {
        &self.tuple
    }

    /// Rendered source text.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Renders [`RunConfiguration`]s for a fixed set of degree limits.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationTemplater {
    limits: DegreeLimits,
}

impl ConfigurationTemplater {
    /// Creates a templater with the given degree limits.
    pub fn new(limits: DegreeLimits) -> Self {
        Self { limits }
    }

    /// Returns the degree limits.
    pub fn limits(&self) -> DegreeLimits {
        self.limits
    }

    /// Renders the configuration for `tuple`.
    ///
    /// Fails when the tuple would produce a negative foreign-connection
    /// count, an empty network or an unusable root count.
    pub fn render(&self, tuple: &ParameterTuple) -> Result<RunConfiguration, SweepError> {
        let label = tuple.label();
        let DegreeLimits { max_outbound, max_inbound } = self.limits;

        if tuple.population == 0 {
            return Err(SweepError::configuration(label, "population must be positive"));
        }
        if tuple.internal_forward > max_outbound {
            return Err(SweepError::configuration(label, format!(
                "internal forward {} exceeds outbound degree {}",
                tuple.internal_forward, max_outbound
            )));
        }
        if tuple.internal_forward > max_inbound {
            return Err(SweepError::configuration(label, format!(
                "internal forward {} exceeds inbound degree {}",
                tuple.internal_forward, max_inbound
            )));
        }
        if !tuple.root_count.is_finite() || tuple.root_count <= 0.0 {
            return Err(SweepError::configuration(label, format!(
                "root count must be a positive number, got {}",
                tuple.root_count
            )));
        }

        let outbound_foreign = max_outbound - tuple.internal_forward;
        let inbound_foreign = max_inbound - tuple.internal_forward;

        // {:?} keeps the fractional part, so 2.0 stays a double literal.
        let source = format!(
            "package simblock.settings;\n\
             \n\
             public class ProposalConfiguration {{\n\
             \x20   public static final int NUM_OF_NODES = {nodes};\n\
             \x20   public static final int MAX_OUTBOUND_NUM = {max_outbound};\n\
             \x20   public static final int MAX_INBOUND_NUM = {max_inbound};\n\
             \x20   public static final int INTERNAL_FORWARD_NUM = {internal};\n\
             \x20   public static final double N_ROOT = {root:?};\n\
             \x20   public static final int OUTBOUND_FOREGIN_NUM = {outbound_foreign};\n\
             \x20   public static final int INBOUND_FOREGIN_NUM = {inbound_foreign};\n\
             \x20   public static final int FOREGION_REGION_NUM = {outbound_foreign};\n\
             \x20   public static final boolean IS_PROPOSAL_USE = {proposal};\n\
             }}\n",
            nodes = tuple.population,
            internal = tuple.internal_forward,
            root = tuple.root_count,
            proposal = tuple.proposal,
        );

        Ok(RunConfiguration {
            tuple: *tuple,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fields() {
        let templater = ConfigurationTemplater::default();
        let config = templater.render(&ParameterTuple::proposed(500, 6, 3.0)).unwrap();
        let source = config.source();

        assert!(source.contains("public static final int NUM_OF_NODES = 500;"));
        assert!(source.contains("public static final int MAX_OUTBOUND_NUM = 8;"));
        assert!(source.contains("public static final int INTERNAL_FORWARD_NUM = 6;"));
        assert!(source.contains("public static final double N_ROOT = 3.0;"));
        assert!(source.contains("public static final int OUTBOUND_FOREGIN_NUM = 2;"));
        assert!(source.contains("public static final int INBOUND_FOREGIN_NUM = 2;"));
        assert!(source.contains("public static final int FOREGION_REGION_NUM = 2;"));
        assert!(source.contains("public static final boolean IS_PROPOSAL_USE = true;"));
        assert!(source.starts_with("package simblock.settings;\n\npublic class ProposalConfiguration {\n    public"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let templater = ConfigurationTemplater::default();
        let tuple = ParameterTuple::baseline(500, 4, 1.0);

        let a = templater.render(&tuple).unwrap();
        let b = templater.render(&tuple).unwrap();

        assert_eq!(a.source().as_bytes(), b.source().as_bytes());
        assert!(a.source().contains("IS_PROPOSAL_USE = false;"));
    }

    #[test]
    fn test_internal_forward_exceeds_degree() {
        let templater = ConfigurationTemplater::default();
        let err = templater.render(&ParameterTuple::proposed(500, 9, 2.0)).unwrap_err();
        assert!(matches!(err, SweepError::ConfigurationError { .. }));

        let asymmetric = ConfigurationTemplater::new(DegreeLimits { max_outbound: 8, max_inbound: 4 });
        let err = asymmetric.render(&ParameterTuple::proposed(500, 5, 2.0)).unwrap_err();
        assert!(err.to_string().contains("inbound degree 4"));
    }

    #[test]
    fn test_internal_forward_equal_to_degree_is_valid() {
        let templater = ConfigurationTemplater::default();
        let config = templater.render(&ParameterTuple::proposed(500, 8, 2.0)).unwrap();
        assert!(config.source().contains("OUTBOUND_FOREGIN_NUM = 0;"));
    }

    #[test]
    fn test_rejects_degenerate_tuples() {
        let templater = ConfigurationTemplater::default();
        assert!(templater.render(&ParameterTuple::proposed(0, 4, 2.0)).is_err());
        assert!(templater.render(&ParameterTuple::proposed(500, 4, f64::NAN)).is_err());
        assert!(templater.render(&ParameterTuple::proposed(500, 4, 0.0)).is_err());
    }
}

//! # Controlled Vocabularies
//!
//! Every closed set of literal values a BIDS Stats Model may use, one enum
//! per vocabulary. Matching is exact: `"run"` is not a `NodeLevel`, only
//! `"Run"` is. Each enum exposes its literals as a `'static` slice so the
//! constraint model in `bsm-schema` is derived from the same definition the
//! typed tree deserializes through; the two cannot drift apart.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! closed_vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident as $schema_name:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $literal:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $literal)]
                $variant,
            )+
        }

        impl $name {
            /// Name of this vocabulary as it appears in violation messages.
            pub const SCHEMA_NAME: &'static str = $schema_name;

            /// Every accepted literal, in declaration order.
            pub const LITERALS: &'static [&'static str] = &[$($literal),+];

            /// Returns the literal this variant is spelled as in a document.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $literal,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_vocabulary! {
    /// Level of analysis a Node operates at.
    NodeLevel as "NodeLevel" {
        Run => "Run",
        Session => "Session",
        Subject => "Subject",
        Dataset => "Dataset",
    }
}

closed_vocabulary! {
    /// Kind of estimator a Node's model describes.
    ModelType as "ModelType" {
        /// General linear model.
        Glm => "glm",
        /// Meta-analysis.
        Meta => "meta",
    }
}

closed_vocabulary! {
    /// Instruction-set identifiers accepted in `Transformations.Transformer`.
    TransformerId as "TransformerID" {
        PybidsTransformsV1 => "pybids-transforms-v1",
    }
}

closed_vocabulary! {
    /// Time-series reduction applied within each value of `Options.Mask`.
    Aggregate as "Aggregate" {
        /// One time course per non-zero voxel.
        None => "none",
        /// Average of all voxels per mask value.
        Mean => "mean",
        /// First principal component per mask value.
        Pca => "pca",
    }
}

closed_vocabulary! {
    /// Hemodynamic response function models.
    HrfModel as "HRFModel" {
        DoubleGamma => "DoubleGamma",
        Gamma => "Gamma",
        FiniteImpulseResponse => "FiniteImpulseResponse",
    }
}

closed_vocabulary! {
    /// Statistic computed for a contrast.
    ///
    /// `pass` computes the weighted sum of parameter estimates without a
    /// statistical test, e.g. to feed beta maps to a higher level.
    StatisticalTest as "StatisticalTest" {
        T => "t",
        F => "F",
        Pass => "pass",
    }
}

impl StatisticalTest {
    /// Whether this test accepts 2-D weights. A `t` test contrasts a single
    /// linear combination and so takes exactly one row.
    pub fn allows_matrix_weights(&self) -> bool {
        !matches!(self, Self::T)
    }
}

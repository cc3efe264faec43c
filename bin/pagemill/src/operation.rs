use std::fmt;

use anyhow::{anyhow, Result};
use rand::{
    distr::{weighted::WeightedIndex, Distribution as _},
    Rng,
};
use serde::Deserialize;

/// An operation that an actor can perform against the books API.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Operation {
    /// Store the sample book.
    Create,

    /// List every book.
    ListAll,

    /// Remove every book.
    ClearAll,

    /// Rename the most recently listed book.
    Update,

    /// Fetch the most recently listed book by its identifier.
    GetById,

    /// Remove the most recently listed book by its identifier.
    Delete,
}

impl Operation {
    /// All operations, in a fixed order.
    pub const ALL: [Operation; 6] = [
        Operation::Create,
        Operation::ListAll,
        Operation::ClearAll,
        Operation::Update,
        Operation::GetById,
        Operation::Delete,
    ];

    /// Returns the name of the operation, as used in configuration and reports.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::ListAll => "list_all",
            Self::ClearAll => "clear_all",
            Self::Update => "update",
            Self::GetById => "get_by_id",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const fn default_weight() -> u32 {
    1
}

/// Relative weight of each operation.
///
/// An operation is picked with probability proportional to its weight. Operations with a weight of zero are never
/// picked. Every operation defaults to a weight of 1.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OperationWeights {
    #[serde(default = "default_weight")]
    pub create: u32,
    #[serde(default = "default_weight")]
    pub list_all: u32,
    #[serde(default = "default_weight")]
    pub clear_all: u32,
    #[serde(default = "default_weight")]
    pub update: u32,
    #[serde(default = "default_weight")]
    pub get_by_id: u32,
    #[serde(default = "default_weight")]
    pub delete: u32,
}

impl OperationWeights {
    /// Returns the weight of the given operation.
    pub fn get(&self, operation: Operation) -> u32 {
        match operation {
            Operation::Create => self.create,
            Operation::ListAll => self.list_all,
            Operation::ClearAll => self.clear_all,
            Operation::Update => self.update,
            Operation::GetById => self.get_by_id,
            Operation::Delete => self.delete,
        }
    }
}

impl Default for OperationWeights {
    fn default() -> Self {
        Self {
            create: default_weight(),
            list_all: default_weight(),
            clear_all: default_weight(),
            update: default_weight(),
            get_by_id: default_weight(),
            delete: default_weight(),
        }
    }
}

/// Weighted random selection of operations.
#[derive(Clone, Debug)]
pub struct OperationPicker {
    index: WeightedIndex<u32>,
}

impl OperationPicker {
    /// Creates a new `OperationPicker` from the given weights.
    ///
    /// # Errors
    ///
    /// If every weight is zero, or the weights sum past `u32::MAX`, an error is returned.
    pub fn new(weights: &OperationWeights) -> Result<Self> {
        let index = WeightedIndex::new(Operation::ALL.iter().map(|op| weights.get(*op)))
            .map_err(|e| anyhow!("Invalid operation weights: {}. At least one weight must be non-zero.", e))?;

        Ok(Self { index })
    }

    /// Picks an operation.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Operation {
        Operation::ALL[self.index.sample(rng)]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng as _};

    use super::*;
    use crate::testing::weights_for;

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = Operation::ALL.iter().map(Operation::name).collect();
        assert_eq!(names.len(), Operation::ALL.len());
    }

    #[test]
    fn default_weights_are_uniform() {
        let weights = OperationWeights::default();
        for operation in Operation::ALL {
            assert_eq!(weights.get(operation), 1);
        }
    }

    #[test]
    fn weights_deserialize_with_defaults() {
        let weights: OperationWeights = serde_json::from_str(r#"{"create": 5, "delete": 0}"#).unwrap();
        assert_eq!(weights.create, 5);
        assert_eq!(weights.delete, 0);
        assert_eq!(weights.list_all, 1);
    }

    #[test]
    fn unknown_weight_is_rejected() {
        let result = serde_json::from_str::<OperationWeights>(r#"{"remove": 1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn all_zero_weights_are_rejected() {
        let weights = OperationWeights {
            create: 0,
            list_all: 0,
            clear_all: 0,
            update: 0,
            get_by_id: 0,
            delete: 0,
        };
        assert!(OperationPicker::new(&weights).is_err());
    }

    #[test]
    fn single_weight_always_picks_that_operation() {
        let mut rng = StdRng::seed_from_u64(7);
        for operation in Operation::ALL {
            let picker = OperationPicker::new(&weights_for(operation)).unwrap();
            for _ in 0..64 {
                assert_eq!(picker.pick(&mut rng), operation);
            }
        }
    }

    #[test]
    fn uniform_weights_reach_every_operation() {
        let picker = OperationPicker::new(&OperationWeights::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        let picked: HashSet<_> = (0..1000).map(|_| picker.pick(&mut rng)).collect();
        assert_eq!(picked.len(), Operation::ALL.len());
    }

    fn arb_weights() -> impl Strategy<Value = OperationWeights> {
        proptest::array::uniform6(0u32..4)
            .prop_filter("at least one weight must be non-zero", |w| w.iter().any(|v| *v > 0))
            .prop_map(|w| OperationWeights {
                create: w[0],
                list_all: w[1],
                clear_all: w[2],
                update: w[3],
                get_by_id: w[4],
                delete: w[5],
            })
    }

    proptest! {
        #[test]
        fn zero_weight_operations_are_never_picked(weights in arb_weights(), seed in any::<u64>()) {
            let picker = OperationPicker::new(&weights).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);

            for _ in 0..200 {
                let operation = picker.pick(&mut rng);
                prop_assert!(weights.get(operation) > 0);
            }
        }
    }
}

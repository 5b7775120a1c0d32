//! Placement rules that sit outside the generic width algorithm.
//!
//! The chain's insert and remove only know about `can_support_inputs`
//! widths. Rules that depend on *which* modules are adjacent, such as where
//! a zero-input generator may sit, live behind [`PlacementPolicy`]. The
//! chain asks the policy before every insert and remove, and the policy
//! answers with either a violation or an optional [`WidthOverride`] the
//! chain applies as part of the same all-or-nothing edit.

use crate::module::ModuleRole;

/// Why the placement policy refused an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlacementViolation {
    /// A generator was placed anywhere but directly after an I/O adapter.
    #[error("a generator must sit directly after an I/O adapter")]
    GeneratorNotAfterAdapter,
    /// Something was placed in front of an existing generator.
    #[error("nothing may be inserted in front of a generator")]
    InFrontOfGenerator,
    /// The adapter feeding a generator was removed while the generator remains.
    #[error("the adapter feeding a generator cannot be removed")]
    AdapterFeedsGenerator,
}

/// Forces the output width of the module at `index` in the signal path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthOverride {
    /// Position of the module to reconfigure.
    pub index: usize,
    /// Output width to force.
    pub outputs: usize,
}

/// Decides whether an insert or remove may proceed.
///
/// `roles` is the current signal path, head first.
pub trait PlacementPolicy: Send {
    /// Checks inserting a module with `role` at `index`.
    fn plan_insert(
        &self,
        roles: &[ModuleRole],
        index: usize,
        role: ModuleRole,
    ) -> Result<Option<WidthOverride>, PlacementViolation>;

    /// Checks removing the module at `index`.
    fn plan_remove(
        &self,
        roles: &[ModuleRole],
        index: usize,
    ) -> Result<Option<WidthOverride>, PlacementViolation>;
}

/// Default policy for zero-input generators.
///
/// A generator may only sit directly after an I/O adapter. Inserting one
/// forces that adapter's outputs to zero; removing it restores them to one.
/// Nothing may be inserted in front of a generator, and the adapter feeding
/// a generator cannot be removed while the generator is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratorPlacement;

impl PlacementPolicy for GeneratorPlacement {
    fn plan_insert(
        &self,
        roles: &[ModuleRole],
        index: usize,
        role: ModuleRole,
    ) -> Result<Option<WidthOverride>, PlacementViolation> {
        if roles.get(index) == Some(&ModuleRole::Generator) {
            return Err(PlacementViolation::InFrontOfGenerator);
        }
        if role != ModuleRole::Generator {
            return Ok(None);
        }
        match index.checked_sub(1).and_then(|i| roles.get(i)) {
            Some(ModuleRole::IoAdapter) => Ok(Some(WidthOverride {
                index: index - 1,
                outputs: 0,
            })),
            _ => Err(PlacementViolation::GeneratorNotAfterAdapter),
        }
    }

    fn plan_remove(
        &self,
        roles: &[ModuleRole],
        index: usize,
    ) -> Result<Option<WidthOverride>, PlacementViolation> {
        match roles.get(index) {
            Some(ModuleRole::IoAdapter)
                if roles.get(index + 1) == Some(&ModuleRole::Generator) =>
            {
                Err(PlacementViolation::AdapterFeedsGenerator)
            }
            Some(ModuleRole::Generator) => {
                match index.checked_sub(1).and_then(|i| roles.get(i)) {
                    Some(ModuleRole::IoAdapter) => Ok(Some(WidthOverride {
                        index: index - 1,
                        outputs: 1,
                    })),
                    _ => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ModuleRole::{Generator, IoAdapter, Processor};

    #[test]
    fn test_processor_anywhere() {
        let roles = [IoAdapter, Processor, IoAdapter];
        for index in 0..=roles.len() {
            assert_eq!(
                GeneratorPlacement.plan_insert(&roles, index, Processor),
                Ok(None)
            );
        }
    }

    #[test]
    fn test_generator_after_adapter_forces_zero() {
        let roles = [IoAdapter, Processor, IoAdapter];
        assert_eq!(
            GeneratorPlacement.plan_insert(&roles, 1, Generator),
            Ok(Some(WidthOverride {
                index: 0,
                outputs: 0
            }))
        );
    }

    #[test]
    fn test_generator_elsewhere_rejected() {
        let roles = [IoAdapter, Processor, IoAdapter];
        for index in [0, 2, 3] {
            assert_eq!(
                GeneratorPlacement.plan_insert(&roles, index, Generator),
                Err(PlacementViolation::GeneratorNotAfterAdapter)
            );
        }
    }

    #[test]
    fn test_nothing_in_front_of_generator() {
        let roles = [IoAdapter, Generator, IoAdapter];
        assert_eq!(
            GeneratorPlacement.plan_insert(&roles, 1, Processor),
            Err(PlacementViolation::InFrontOfGenerator)
        );
        assert_eq!(
            GeneratorPlacement.plan_insert(&roles, 1, Generator),
            Err(PlacementViolation::InFrontOfGenerator)
        );
        assert_eq!(
            GeneratorPlacement.plan_insert(&roles, 2, Processor),
            Ok(None)
        );
    }

    #[test]
    fn test_remove_generator_restores_one() {
        let roles = [IoAdapter, Generator, Processor, IoAdapter];
        assert_eq!(
            GeneratorPlacement.plan_remove(&roles, 1),
            Ok(Some(WidthOverride {
                index: 0,
                outputs: 1
            }))
        );
        assert_eq!(
            GeneratorPlacement.plan_remove(&roles, 0),
            Err(PlacementViolation::AdapterFeedsGenerator)
        );
        assert_eq!(GeneratorPlacement.plan_remove(&roles, 2), Ok(None));
        assert_eq!(GeneratorPlacement.plan_remove(&roles, 3), Ok(None));
    }
}

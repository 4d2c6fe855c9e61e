use std::collections::BTreeMap;

use crate::migration::error::{MigrationError, MigrationResult};
use crate::migration::step::VersionedStep;

/// The catalogue of steps for one record family, keyed by `version_before`.
///
/// Construction enforces the two invariants resolution relies on: every step moves strictly
/// forward and no two steps start at the same version, so there is at most one path between
/// any two versions.
#[derive(Debug)]
pub struct MigrationRegistry<S> {
    family: String,
    steps: BTreeMap<u32, S>,
}

impl<S: VersionedStep> MigrationRegistry<S> {
    /// Builds a registry.
    ///
    /// # Errors
    /// `MigrationError::InvalidRegistry` if a step does not move forward or two steps share a
    /// `version_before`.
    pub fn new(family: impl Into<String>, steps: Vec<S>) -> MigrationResult<Self> {
        let family = family.into();
        let mut by_version = BTreeMap::new();

        for step in steps {
            if step.version_after() <= step.version_before() {
                return Err(MigrationError::InvalidRegistry {
                    family,
                    message: format!(
                        "step `{}` goes from {} to {}",
                        step.name(),
                        step.version_before(),
                        step.version_after()
                    ),
                });
            }
            let version_before = step.version_before();
            if let Some(existing) = by_version.insert(version_before, step) {
                return Err(MigrationError::InvalidRegistry {
                    family,
                    message: format!(
                        "two steps start at version {version_before} (`{}`)",
                        existing.name()
                    ),
                });
            }
        }

        Ok(Self {
            family,
            steps: by_version,
        })
    }

    /// The record family this registry migrates.
    #[must_use]
    pub fn family(&self) -> &str {
        &self.family
    }

    /// The highest version any step produces.
    #[must_use]
    pub fn latest_version(&self) -> Option<u32> {
        self.steps.values().map(VersionedStep::version_after).max()
    }

    /// All steps ordered by `version_before`.
    pub fn steps(&self) -> impl Iterator<Item = &S> {
        self.steps.values()
    }

    /// Resolves the unique chain from `initial` to `target`.
    ///
    /// # Errors
    /// - `DowngradeUnsupported` if `initial > target`
    /// - `NoMigrationPathFound` if no step starts at a version on the way, or the only step
    ///   from there jumps past `target`
    pub fn resolve(&self, initial: u32, target: u32) -> MigrationResult<MigrationChain<'_, S>> {
        if initial > target {
            return Err(MigrationError::DowngradeUnsupported {
                family: self.family.clone(),
                stored: initial,
                target,
            });
        }

        let mut steps = Vec::new();
        let mut version = initial;

        while version != target {
            let step = self
                .steps
                .get(&version)
                .filter(|step| step.version_after() <= target)
                .ok_or_else(|| MigrationError::NoMigrationPathFound {
                    family: self.family.clone(),
                    at_version: version,
                    target,
                })?;
            steps.push(step);
            version = step.version_after();
        }

        Ok(MigrationChain {
            initial,
            target,
            steps,
        })
    }
}

/// The ordered, contiguous list of steps between two versions.
#[derive(Debug)]
pub struct MigrationChain<'a, S> {
    initial: u32,
    target: u32,
    steps: Vec<&'a S>,
}

impl<'a, S: VersionedStep> MigrationChain<'a, S> {
    /// Version the chain starts from.
    #[must_use]
    pub const fn initial_version(&self) -> u32 {
        self.initial
    }

    /// Version the chain ends at.
    #[must_use]
    pub const fn target_version(&self) -> u32 {
        self.target
    }

    /// Whether the record is already at the target.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// The steps in application order.
    pub fn steps(&self) -> impl Iterator<Item = &'a S> + '_ {
        self.steps.iter().copied()
    }
}

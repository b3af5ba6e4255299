use crate::error::{PetalSfxError, Result};
use crate::random::random_index;
use crate::sound::SoundId;
use rand::Rng;

/// Handle to a [`VariantGroup`] registered with the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(pub(crate) usize);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

/// A set of interchangeable sounds; each play picks one member uniformly at random.
///
/// Members are referenced by id only, and every pick is an independent draw (repeats allowed).
#[derive(Debug, Clone)]
pub struct VariantGroup {
    members: Vec<SoundId>,
}

impl VariantGroup {
    pub fn new(members: Vec<SoundId>) -> Result<Self> {
        if members.is_empty() {
            return Err(PetalSfxError::Configuration(
                "A variant group needs at least one member".to_string(),
            ));
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> &[SoundId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> SoundId {
        self.members[random_index(rng, self.members.len())]
    }
}

//! Checks that an assignment only references terms the store knows about.

use mealiesync_shared::{Assignment, TaxonomyKind};

use crate::taxonomy::TaxonomySnapshot;

/// Which half of a [`TermActions`](mealiesync_shared::TermActions) a name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionList {
    Set,
    Unset,
}

impl ActionList {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Unset => "unset",
        }
    }
}

/// One referenced name that is absent from the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingTerm {
    pub kind: TaxonomyKind,
    pub list: ActionList,
    pub name: String,
}

/// Check every set/unset name of `assignment` against `snapshot`.
///
/// Returns all missing names, one entry per occurrence, in the order
/// categories.set, categories.unset, tags.set, tags.unset.
pub fn validate(
    assignment: &Assignment,
    snapshot: &TaxonomySnapshot,
) -> Result<(), Vec<MissingTerm>> {
    let mut missing = Vec::new();

    for kind in [TaxonomyKind::Categories, TaxonomyKind::Tags] {
        let known = snapshot.terms(kind);
        let actions = assignment.actions(kind);
        let lists = [
            (ActionList::Set, &actions.set),
            (ActionList::Unset, &actions.unset),
        ];

        for (list, names) in lists {
            missing.extend(
                names
                    .iter()
                    .filter(|name| !known.contains(name))
                    .map(|name| MissingTerm {
                        kind,
                        list,
                        name: name.clone(),
                    }),
            );
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}

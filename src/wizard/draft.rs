/// In-memory draft owned by a single wizard session.
///
/// Writes go through closures over `&mut D`, so a nested update such as
/// `draft.address.city = ..` only touches the field it names. Nothing is
/// validated here; that is left to navigation and commit.
#[derive(Debug, Clone)]
pub struct DraftStore<D> {
    draft: D,
    initial: D,
    revision: u64,
}

impl<D: Clone + Default> Default for DraftStore<D> {
    fn default() -> Self {
        Self::new(D::default())
    }
}

impl<D: Clone> DraftStore<D> {
    pub fn new(initial: D) -> Self {
        Self {
            draft: initial.clone(),
            initial,
            revision: 0,
        }
    }

    pub fn get(&self) -> &D {
        &self.draft
    }

    pub fn set<R>(&mut self, patch: impl FnOnce(&mut D) -> R) -> R {
        self.revision += 1;
        patch(&mut self.draft)
    }

    /// Applies `patch` to a copy and keeps it only on success, so a failed
    /// binding cannot leave a half-written draft behind.
    pub fn try_set<R, E>(
        &mut self,
        patch: impl FnOnce(&mut D) -> Result<R, E>,
    ) -> Result<R, E> {
        let mut staged = self.draft.clone();
        let result = patch(&mut staged)?;
        self.draft = staged;
        self.revision += 1;
        Ok(result)
    }

    pub fn replace(&mut self, draft: D) {
        self.draft = draft;
        self.revision += 1;
    }

    /// Restores the initial draft, or adopts `initial` as the new baseline.
    pub fn reset(&mut self, initial: Option<D>) {
        if let Some(initial) = initial {
            self.initial = initial;
        }
        self.draft = self.initial.clone();
        self.revision += 1;
    }

    pub fn initial(&self) -> &D {
        &self.initial
    }

    /// Number of writes since creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Address {
        street: String,
        zip: String,
        city: String,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Draft {
        name: String,
        address: Address,
    }

    #[test]
    fn nested_patch_keeps_siblings() {
        let mut store = DraftStore::new(Draft {
            name: "Lea".into(),
            address: Address {
                street: "Bahnhofstrasse 1".into(),
                zip: "8001".into(),
                city: String::new(),
            },
        });
        store.set(|draft| draft.address.city = "Zürich".into());

        let address = &store.get().address;
        assert_eq!(address.street, "Bahnhofstrasse 1");
        assert_eq!(address.zip, "8001");
        assert_eq!(address.city, "Zürich");
        assert_eq!(store.get().name, "Lea");
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn failed_try_set_leaves_draft_untouched() {
        let mut store = DraftStore::<Draft>::default();
        let result: Result<(), &str> = store.try_set(|draft| {
            draft.name = "half written".into();
            Err("rejected")
        });
        assert!(result.is_err());
        assert_eq!(store.get(), &Draft::default());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn reset_restores_or_rebases_initial() {
        let mut store = DraftStore::<Draft>::default();
        store.set(|draft| draft.name = "Nina".into());
        store.reset(None);
        assert_eq!(store.get(), &Draft::default());

        let seeded = Draft {
            name: "Seed".into(),
            ..Draft::default()
        };
        store.reset(Some(seeded.clone()));
        store.set(|draft| draft.name.push('!'));
        store.reset(None);
        assert_eq!(store.get(), &seeded);
    }
}

use crate::DEFAULT_FACET_SIZE;

///
/// FacetInclude
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum FacetInclude {
    #[default]
    All,
    None,
    /// Normalized dimension names.
    Only(Vec<String>),
}

///
/// FacetSelection
///
/// Which dimensions to aggregate and how many terms buckets to keep.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FacetSelection {
    include: FacetInclude,
    size: u32,
}

impl Default for FacetSelection {
    fn default() -> Self {
        Self {
            include: FacetInclude::All,
            size: DEFAULT_FACET_SIZE,
        }
    }
}

impl FacetSelection {
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            include: FacetInclude::None,
            size: DEFAULT_FACET_SIZE,
        }
    }

    /// `all`, `none`, or a comma list of dimension names (any case style).
    #[must_use]
    pub fn with_include(self, raw: &str) -> Self {
        if self.include == FacetInclude::None {
            return self;
        }
        let include = match raw.trim().to_lowercase().as_str() {
            "all" => FacetInclude::All,
            "none" => FacetInclude::None,
            list => FacetInclude::Only(
                list.split(',')
                    .map(normalize)
                    .filter(|name| !name.is_empty())
                    .collect(),
            ),
        };

        Self { include, ..self }
    }

    /// A size of zero disables facets.
    #[must_use]
    pub fn with_size(self, size: u32) -> Self {
        if size == 0 {
            return Self::disabled();
        }

        Self { size, ..self }
    }

    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.include == FacetInclude::None
    }

    #[must_use]
    pub fn includes(&self, name: &str) -> bool {
        match &self.include {
            FacetInclude::All => true,
            FacetInclude::None => false,
            FacetInclude::Only(names) => {
                let wanted = normalize(name);
                names.iter().any(|n| *n == wanted)
            }
        }
    }
}

// `resourceTypes`, `resource_types`, and `resource-types` compare equal.
fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

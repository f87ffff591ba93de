//! Named dimension spaces.
//!
//! A [`DimensionSpace`] lists parameter dimensions first, then set (iterator)
//! dimensions. Each dimension has a fixed positional slot and an optional name.
//! Constraint rows use a different column order (iterators, then parameters,
//! then the constant), see [`DimensionSpace::column`].

use std::fmt;

use log::{debug, warn};

use crate::types::DimKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DimensionSpace {
    params: Vec<Option<String>>,
    set: Vec<Option<String>>,
}

impl DimensionSpace {
    /// Allocates a space with `num_params` parameter and `num_set` set dimensions, all unnamed.
    pub fn alloc(num_params: usize, num_set: usize) -> Self {
        Self {
            params: vec![None; num_params],
            set: vec![None; num_set],
        }
    }

    /// Builds the space of one statement.
    ///
    /// `parameters` is the program-wide parameter ordering, shared by every
    /// statement. `iterators` are the statement's iterator names, if known;
    /// without them the set dimensions stay unnamed.
    pub fn build(parameters: &[String], num_iterators: usize, iterators: Option<&[String]>) -> Self {
        let mut space = Self::alloc(parameters.len(), num_iterators);

        for (pos, name) in parameters.iter().enumerate() {
            space.set_dim_name(DimKind::Param, pos, name);
        }

        match iterators {
            Some(names) => {
                if names.len() != num_iterators {
                    warn!(
                        "Statement has {} iterators but {} iterator names",
                        num_iterators,
                        names.len()
                    );
                }
                for (pos, name) in names.iter().take(num_iterators).enumerate() {
                    space.set_dim_name(DimKind::Set, pos, name);
                }
            }
            None => {
                if num_iterators > 0 {
                    debug!("No iterator names, leaving {} set dimensions unnamed", num_iterators);
                }
            }
        }

        space
    }

    fn dims(&self, kind: DimKind) -> &[Option<String>] {
        match kind {
            DimKind::Param => &self.params,
            DimKind::Set => &self.set,
        }
    }

    /// Names a dimension.
    ///
    /// Names are unique within a space: a name already used by another
    /// dimension is rejected with a warning and the slot stays as it was.
    /// Returns whether the name was assigned.
    pub fn set_dim_name(&mut self, kind: DimKind, pos: usize, name: &str) -> bool {
        if let Some((other_kind, other_pos)) = self.find_any(name) {
            if (other_kind, other_pos) != (kind, pos) {
                warn!(
                    "Dimension name '{}' already used by {} dimension {}, leaving {} dimension {} unnamed",
                    name, other_kind, other_pos, kind, pos
                );
                return false;
            }
        }
        let slot = match kind {
            DimKind::Param => self.params.get_mut(pos),
            DimKind::Set => self.set.get_mut(pos),
        };
        match slot {
            Some(slot) => {
                *slot = Some(name.to_string());
                true
            }
            None => false,
        }
    }

    fn find_any(&self, name: &str) -> Option<(DimKind, usize)> {
        self.find_dim_by_name(DimKind::Param, name)
            .map(|pos| (DimKind::Param, pos))
            .or_else(|| self.find_dim_by_name(DimKind::Set, name).map(|pos| (DimKind::Set, pos)))
    }

    /// Number of dimensions of the given kind.
    pub fn dim(&self, kind: DimKind) -> usize {
        self.dims(kind).len()
    }

    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    pub fn num_set(&self) -> usize {
        self.set.len()
    }

    /// Name of a dimension, `None` if unnamed or out of range.
    pub fn name(&self, kind: DimKind, pos: usize) -> Option<&str> {
        self.dims(kind).get(pos).and_then(|n| n.as_deref())
    }

    /// Position of the named dimension of the given kind.
    ///
    /// Unnamed dimensions never match.
    pub fn find_dim_by_name(&self, kind: DimKind, name: &str) -> Option<usize> {
        self.dims(kind).iter().position(|n| n.as_deref() == Some(name))
    }

    /// Printable label: the name, or `p<k>` / `i<k>` for unnamed slots.
    pub fn label(&self, kind: DimKind, pos: usize) -> String {
        match self.name(kind, pos) {
            Some(name) => name.to_string(),
            None => match kind {
                DimKind::Param => format!("p{}", pos),
                DimKind::Set => format!("i{}", pos),
            },
        }
    }

    /// Constraint-row column of a dimension.
    ///
    /// ```text
    /// set k   -> k
    /// param k -> #set + k
    /// const   -> #set + #param   (see `constant_column`)
    /// ```
    pub fn column(&self, kind: DimKind, pos: usize) -> usize {
        match kind {
            DimKind::Set => pos,
            DimKind::Param => self.set.len() + pos,
        }
    }

    pub fn constant_column(&self) -> usize {
        self.set.len() + self.params.len()
    }

    /// Number of coefficient columns in a constraint row over this space.
    pub fn num_columns(&self) -> usize {
        self.constant_column() + 1
    }

    /// The parameter-only space (set dimensions dropped).
    pub fn params_space(&self) -> DimensionSpace {
        Self {
            params: self.params.clone(),
            set: Vec::new(),
        }
    }
}

impl fmt::Display for DimensionSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = (0..self.num_params()).map(|k| self.label(DimKind::Param, k)).collect();
        let set: Vec<String> = (0..self.num_set()).map(|k| self.label(DimKind::Set, k)).collect();
        write!(f, "[{}] -> {{ [{}] }}", params.join(", "), set.join(", "))
    }
}

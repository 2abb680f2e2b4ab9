/*!
 # Lighting groups

 The fixed set of groups the bridge addresses, created once at startup.
*/

use crate::bridge::MAX_GROUPS;
use crate::config::ConfigError;

/// An addressable lighting group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Group {
    id: u8,
}

impl Group {
    /// 1-based id as seen by callers and the bridge
    pub fn id(&self) -> u8 {
        self.id
    }
}

/// Owns every configured group for the lifetime of the process
#[derive(Debug, Clone)]
pub struct GroupRegistry {
    groups: Vec<Group>,
}

impl GroupRegistry {
    /// Creates `count` groups with ids `1..=count`. The bridge addresses at
    /// most [`MAX_GROUPS`] groups.
    pub fn new(count: u8) -> Result<Self, ConfigError> {
        if count == 0 || count > MAX_GROUPS {
            return Err(ConfigError::GroupCount(count));
        }
        let groups = (1..=count).map(|id| Group { id }).collect();
        Ok(Self { groups })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns the group at a 0-based index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range. Selectors produced by
    /// [`crate::codec::parse_target`] are always in range.
    pub fn get(&self, index: usize) -> &Group {
        &self.groups[index]
    }

    /// All groups in creation order
    pub fn all(&self) -> &[Group] {
        &self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_from_one() {
        let registry = GroupRegistry::new(4).unwrap();
        let ids: Vec<u8> = registry.all().iter().map(Group::id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn get_uses_zero_based_index() {
        let registry = GroupRegistry::new(4).unwrap();
        assert_eq!(registry.get(0).id(), 1);
        assert_eq!(registry.get(3).id(), 4);
    }

    #[test]
    #[should_panic]
    fn get_out_of_range_panics() {
        let registry = GroupRegistry::new(4).unwrap();
        registry.get(4);
    }

    #[test]
    fn zero_groups_is_rejected() {
        assert!(matches!(GroupRegistry::new(0), Err(ConfigError::GroupCount(0))));
    }

    #[test]
    fn more_groups_than_the_bridge_addresses_is_rejected() {
        assert!(GroupRegistry::new(MAX_GROUPS).is_ok());
        assert!(matches!(GroupRegistry::new(5), Err(ConfigError::GroupCount(5))));
    }
}

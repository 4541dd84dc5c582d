extern crate fnv;

use fnv::FnvHashSet;

/// Statistics of a ratings dataset, collected in the first ingestion pass:
/// the distinct user and item id sets, the record count and the largest item
/// id seen, which fixes the dimensionality of the dense projections.
pub struct DataDictionary {
    users: FnvHashSet<u32>,
    items: FnvHashSet<u32>,
    num_ratings: u64,
    max_item: u32,
}

impl DataDictionary {

    pub fn new() -> Self {
        DataDictionary {
            users: FnvHashSet::default(),
            items: FnvHashSet::default(),
            num_ratings: 0,
            max_item: 0,
        }
    }

    pub fn observe(&mut self, user: u32, item: u32) {
        self.users.insert(user);
        self.items.insert(item);
        self.num_ratings += 1;
        if item > self.max_item {
            self.max_item = item;
        }
    }

    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn num_ratings(&self) -> u64 {
        self.num_ratings
    }

    /// Max item id + 1, the shared declared dimensionality of all rows.
    pub fn dimensions(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            self.max_item as usize + 1
        }
    }

    pub fn users(&self) -> &FnvHashSet<u32> {
        &self.users
    }

    pub fn items(&self) -> &FnvHashSet<u32> {
        &self.items
    }
}

use std::collections::BTreeMap;
use std::ops::RangeBounds;
use std::rc::Rc;

use persistent_trees::AggregatedData;

/// Dummy persistent map, every mutation copies the whole map.
#[derive(Debug, Clone)]
pub struct SlowMap<K: Ord, Ag: AggregatedData> {
    map: Rc<BTreeMap<K, Ag::Data>>,
}

#[allow(dead_code)]
impl<K: Ord + Clone, Ag: AggregatedData> SlowMap<K, Ag> {
    pub fn new() -> Self {
        Self {
            map: Rc::new(BTreeMap::new()),
        }
    }
    pub fn insert(&self, key: K, data: Ag::Data) -> Self {
        let mut map = (*self.map).clone();
        map.entry(key).or_insert(data);
        Self { map: Rc::new(map) }
    }
    pub fn remove(&self, key: &K) -> Self {
        let mut map = (*self.map).clone();
        map.remove(key);
        Self { map: Rc::new(map) }
    }
    pub fn mutate_data(&self, key: &K, f: impl FnOnce(&mut Ag::Data)) -> Self {
        let mut map = (*self.map).clone();
        if let Some(d) = map.get_mut(key) {
            f(d);
        }
        Self { map: Rc::new(map) }
    }
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }
    pub fn get(&self, key: &K) -> Option<&Ag::Data> {
        self.map.get(key)
    }
    pub fn len(&self) -> usize {
        self.map.len()
    }
    pub fn keys(&self) -> Vec<K> {
        self.map.keys().cloned().collect()
    }
    pub fn range_agg(&self, range: impl RangeBounds<K>) -> Ag {
        self.map
            .range(range)
            .fold(Ag::default(), |ag, (_, d)| ag.merge(Ag::from(d)))
    }
}

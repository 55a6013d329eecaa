use mlb_monitor::GamePk;
use std::collections::HashSet;

/// Games already alerted during this process run. Only grows; a restart is
/// the only reset.
#[derive(Debug, Default)]
pub struct NotifiedSet {
    seen: HashSet<GamePk>,
}

impl NotifiedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, game_pk: GamePk) -> bool {
        self.seen.contains(&game_pk)
    }

    pub fn insert(&mut self, game_pk: GamePk) {
        self.seen.insert(game_pk);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut set = NotifiedSet::new();
        assert!(set.is_empty());
        assert!(!set.contains(GamePk(100)));

        set.insert(GamePk(100));
        set.insert(GamePk(100));

        assert!(set.contains(GamePk(100)));
        assert!(!set.contains(GamePk(101)));
        assert_eq!(set.len(), 1);
    }
}

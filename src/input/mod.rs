//! Keybinding dispatch table.

use std::collections::HashMap;

use wavy_config::{Action, Binds, Key, Keysym, Modifiers};

/// Maps `(modifiers, keysym)` to an action. Rebinding a key replaces the
/// previous action.
#[derive(Debug, Default)]
pub struct Bindings {
    map: HashMap<Key, Action>,
}

impl Bindings {
    pub fn new(binds: &Binds) -> Self {
        let mut bindings = Self::default();
        for bind in &binds.0 {
            bindings.bind(bind.key, bind.action.clone());
        }
        bindings
    }

    pub fn bind(&mut self, key: Key, action: Action) {
        self.map.insert(key, action);
    }

    pub fn lookup(&self, modifiers: Modifiers, keysym: Keysym) -> Option<&Action> {
        self.map.get(&Key { modifiers, keysym })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use wavy_config::{Bind, CycleDirection, Direction};

    use super::*;

    fn key(mods: Modifiers, sym: u32) -> Key {
        Key {
            modifiers: mods,
            keysym: Keysym(sym),
        }
    }

    #[test]
    fn duplicate_binds_overwrite() {
        let binds = Binds(vec![
            Bind {
                key: key(Modifiers::SUPER, 0x6a),
                action: Action::Select(Direction::Down),
            },
            Bind {
                key: key(Modifiers::SUPER, 0x6a),
                action: Action::CycleView(CycleDirection::Next),
            },
        ]);

        let bindings = Bindings::new(&binds);
        assert_eq!(bindings.len(), 1);
        assert_eq!(
            bindings.lookup(Modifiers::SUPER, Keysym(0x6a)),
            Some(&Action::CycleView(CycleDirection::Next))
        );
    }

    #[test]
    fn lookup_requires_exact_modifiers() {
        let mut bindings = Bindings::default();
        bindings.bind(key(Modifiers::SUPER, 0x71), Action::Exit);

        assert!(bindings
            .lookup(Modifiers::SUPER | Modifiers::SHIFT, Keysym(0x71))
            .is_none());
        assert_eq!(
            bindings.lookup(Modifiers::SUPER, Keysym(0x71)),
            Some(&Action::Exit)
        );
    }
}

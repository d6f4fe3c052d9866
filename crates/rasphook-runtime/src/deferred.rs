//! One-shot deferred values.
//!
//! A [`Deferred`] is what script holds; the matching [`Resolver`] stays with
//! the completion pump. Both halves share one single-assignment slot and are
//! confined to the engine thread.

use crate::error::SettleError;
use rasphook_core::ScriptValue;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Final state of a deferred value.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Fulfilled(ScriptValue),
    Rejected(ScriptValue),
}

impl Settlement {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settlement::Fulfilled(_))
    }

    pub fn value(&self) -> &ScriptValue {
        match self {
            Settlement::Fulfilled(value) | Settlement::Rejected(value) => value,
        }
    }
}

type Reaction = Box<dyn FnOnce(&Settlement)>;

enum Slot {
    Pending(Vec<Reaction>),
    Settled(Settlement),
}

/// Create a pending deferred value and its resolver.
pub fn deferred() -> (Deferred, Resolver) {
    let slot = Rc::new(RefCell::new(Slot::Pending(Vec::new())));
    (
        Deferred {
            slot: Rc::clone(&slot),
        },
        Resolver { slot },
    )
}

/// Script-side handle to a result that may not exist yet.
#[derive(Clone)]
pub struct Deferred {
    slot: Rc<RefCell<Slot>>,
}

impl Deferred {
    pub fn is_pending(&self) -> bool {
        matches!(*self.slot.borrow(), Slot::Pending(_))
    }

    pub fn settlement(&self) -> Option<Settlement> {
        match &*self.slot.borrow() {
            Slot::Pending(_) => None,
            Slot::Settled(settlement) => Some(settlement.clone()),
        }
    }

    /// Run `reaction` once the value settles, or right away if it already has.
    pub fn on_settled<F>(&self, reaction: F)
    where
        F: FnOnce(&Settlement) + 'static,
    {
        let settled = {
            let mut slot = self.slot.borrow_mut();
            match &mut *slot {
                Slot::Pending(reactions) => {
                    reactions.push(Box::new(reaction));
                    return;
                }
                Slot::Settled(settlement) => settlement.clone(),
            }
        };
        reaction(&settled);
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("settlement", &self.settlement())
            .finish()
    }
}

/// Producer half of a deferred value.
pub struct Resolver {
    slot: Rc<RefCell<Slot>>,
}

impl Resolver {
    pub fn resolve(&self, value: ScriptValue) -> Result<(), SettleError> {
        self.settle(Settlement::Fulfilled(value))
    }

    pub fn reject(&self, reason: ScriptValue) -> Result<(), SettleError> {
        self.settle(Settlement::Rejected(reason))
    }

    pub fn is_settled(&self) -> bool {
        matches!(*self.slot.borrow(), Slot::Settled(_))
    }

    fn settle(&self, settlement: Settlement) -> Result<(), SettleError> {
        // Reactions run after the borrow ends so they may inspect the value.
        let reactions = {
            let mut slot = self.slot.borrow_mut();
            if let Slot::Settled(_) = &*slot {
                return Err(SettleError::AlreadySettled);
            }
            match std::mem::replace(&mut *slot, Slot::Settled(settlement.clone())) {
                Slot::Pending(reactions) => reactions,
                Slot::Settled(_) => Vec::new(),
            }
        };
        for reaction in reactions {
            reaction(&settlement);
        }
        Ok(())
    }
}

impl Drop for Resolver {
    // An unsettled value can never settle now. Reactions may hold clones of
    // their own `Deferred`, so release them to free the slot.
    fn drop(&mut self) {
        let reactions = match &mut *self.slot.borrow_mut() {
            Slot::Pending(reactions) => std::mem::take(reactions),
            Slot::Settled(_) => Vec::new(),
        };
        drop(reactions);
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("settled", &self.is_settled())
            .finish()
    }
}

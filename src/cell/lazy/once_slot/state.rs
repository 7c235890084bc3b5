/// Lifecycle of an instance slot.
///
/// `Unset → Constructing` happens for at most one caller at a time;
/// `Constructing → Set` on success, `Constructing → Unset` if the recipe fails
/// or panics. `Set` is terminal.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum State {
    /// No value yet; the next caller will try to construct one.
    Unset = 0,
    /// A caller holds the slot's lock and is running the recipe.
    Constructing = 1,
    /// The value is published and will never change.
    Set = 2,
}

impl State {
    pub(super) const UNSET: u8 = State::Unset as u8;
    pub(super) const CONSTRUCTING: u8 = State::Constructing as u8;
    pub(super) const SET: u8 = State::Set as u8;

    #[inline]
    pub(super) const fn from_u8(raw: u8) -> Self {
        match raw {
            Self::UNSET => State::Unset,
            Self::CONSTRUCTING => State::Constructing,
            _ => {
                debug_assert!(raw == Self::SET);
                State::Set
            }
        }
    }
}

/// Outcome of synthesizing a child Resource.
///
/// `Absent` is a steady state and not an error: the NodeAgent does not carry
/// enough information yet, so there is nothing to create this cycle.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Synthesis<T> {
    Present(T),
    Absent,
}

impl<T> Synthesis<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Synthesis::Present(_))
    }

    pub fn map<U, F>(self, f: F) -> Synthesis<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Synthesis::Present(value) => Synthesis::Present(f(value)),
            Synthesis::Absent => Synthesis::Absent,
        }
    }
}

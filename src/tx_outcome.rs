/// How a transactional unit of work ended.
///
/// `RolledBack` carries the unit's own error after its effects were discarded. `Failed`
/// means the transaction machinery itself broke: `BEGIN` or `COMMIT` failed, so the unit
/// either never ran or its effects are not persisted.
#[derive(Debug)]
#[must_use]
pub enum TxOutcome<T, E> {
    Committed(T),
    RolledBack(E),
    Failed(E),
}

impl<T, E> TxOutcome<T, E> {
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, TxOutcome::Committed(_))
    }

    /// Collapse into a plain `Result`, keeping whichever error ended the transaction.
    ///
    /// # Errors
    /// Returns the unit's error for `RolledBack` and the begin/commit error for `Failed`.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            TxOutcome::Committed(value) => Ok(value),
            TxOutcome::RolledBack(err) | TxOutcome::Failed(err) => Err(err),
        }
    }

    /// The committed value, if any.
    pub fn committed(self) -> Option<T> {
        match self {
            TxOutcome::Committed(value) => Some(value),
            _ => None,
        }
    }
}

//! Closed outcome sets for calls and conversions.

use std::fmt;

use crate::Qualifier;

/// Outcome of a dispatched call.
///
/// Each value is mutually exclusive. The first five describe where a value
/// landed; the rest describe why none was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// No value; valid only for calls that return nothing.
    None,
    /// The value was placed inline in the target.
    Stack,
    /// The result is a live shared reference to existing storage.
    Read,
    /// The result is a live mutable reference to existing storage.
    Write,
    /// The value was placed on the heap; the target owns it.
    Heap,
    /// No overload accepts this self qualifier or self type.
    Impossible,
    /// The argument count matches no overload.
    WrongNumber,
    /// An argument did not bind to any accepted parameter type.
    WrongType,
    /// The callee produced a value whose shape the target refuses.
    WrongReturn,
    /// The callee raised a domain error, stashed on the target.
    Exception,
    /// An allocation failed.
    OutOfMemory,
}

impl Status {
    /// The status for a value that landed with the given qualifier.
    pub fn from_landed(q: Qualifier) -> Self {
        match q {
            Qualifier::Stack => Status::Stack,
            Qualifier::Heap => Status::Heap,
            Qualifier::Read => Status::Read,
            Qualifier::Write => Status::Write,
        }
    }

    /// Where the produced value lives, if one was produced.
    pub fn produced(self) -> Option<Qualifier> {
        match self {
            Status::Stack => Some(Qualifier::Stack),
            Status::Heap => Some(Qualifier::Heap),
            Status::Read => Some(Qualifier::Read),
            Status::Write => Some(Qualifier::Write),
            _ => None,
        }
    }

    /// Check if the call completed (with or without a value).
    pub fn is_success(self) -> bool {
        matches!(
            self,
            Status::None | Status::Stack | Status::Read | Status::Write | Status::Heap
        )
    }

    /// Check if the call was rejected before any user code ran.
    pub fn is_mismatch(self) -> bool {
        matches!(
            self,
            Status::Impossible | Status::WrongNumber | Status::WrongType | Status::WrongReturn
        )
    }

    /// Short name.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::None => "None",
            Status::Stack => "Stack",
            Status::Read => "Read",
            Status::Write => "Write",
            Status::Heap => "Heap",
            Status::Impossible => "Impossible",
            Status::WrongNumber => "WrongNumber",
            Status::WrongType => "WrongType",
            Status::WrongReturn => "WrongReturn",
            Status::Exception => "Exception",
            Status::OutOfMemory => "OutOfMemory",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a source type expressing itself as what a target wants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DumpStatus {
    /// A live mutable reference was written.
    Mutable,
    /// A live shared reference was written.
    Const,
    /// A value was placed on the heap.
    Heap,
    /// A value was placed inline.
    Stack,
    /// The source declined.
    None,
    /// The conversion raised a domain error.
    Exception,
    /// An allocation failed.
    OutOfMemory,
}

impl DumpStatus {
    /// The status for a value that landed with the given qualifier.
    pub fn from_landed(q: Qualifier) -> Self {
        match q {
            Qualifier::Stack => DumpStatus::Stack,
            Qualifier::Heap => DumpStatus::Heap,
            Qualifier::Read => DumpStatus::Const,
            Qualifier::Write => DumpStatus::Mutable,
        }
    }
}

/// Outcome of a target type constructing itself from a foreign source.
///
/// Also the outcome of the combined Dump-then-Load resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadStatus {
    /// A live mutable reference was written.
    Mutable,
    /// A live shared reference was written.
    Const,
    /// A value was placed on the heap.
    Heap,
    /// A value was placed inline.
    Stack,
    /// No conversion applies.
    None,
    /// The conversion raised a domain error.
    Exception,
    /// An allocation failed.
    OutOfMemory,
}

impl LoadStatus {
    /// The status for a value that landed with the given qualifier.
    pub fn from_landed(q: Qualifier) -> Self {
        DumpStatus::from_landed(q).into()
    }

    /// Check if a value or reference was written.
    pub fn is_success(self) -> bool {
        matches!(
            self,
            LoadStatus::Mutable | LoadStatus::Const | LoadStatus::Heap | LoadStatus::Stack
        )
    }

    /// The call status with the same meaning.
    ///
    /// A declined conversion (`None`) means the produced value has the wrong
    /// shape, so it maps to `WrongReturn`.
    pub fn into_status(self) -> Status {
        match self {
            LoadStatus::Mutable => Status::Write,
            LoadStatus::Const => Status::Read,
            LoadStatus::Heap => Status::Heap,
            LoadStatus::Stack => Status::Stack,
            LoadStatus::None => Status::WrongReturn,
            LoadStatus::Exception => Status::Exception,
            LoadStatus::OutOfMemory => Status::OutOfMemory,
        }
    }
}

impl From<DumpStatus> for LoadStatus {
    fn from(s: DumpStatus) -> Self {
        match s {
            DumpStatus::Mutable => LoadStatus::Mutable,
            DumpStatus::Const => LoadStatus::Const,
            DumpStatus::Heap => LoadStatus::Heap,
            DumpStatus::Stack => LoadStatus::Stack,
            DumpStatus::None => LoadStatus::None,
            DumpStatus::Exception => LoadStatus::Exception,
            DumpStatus::OutOfMemory => LoadStatus::OutOfMemory,
        }
    }
}

// Frames and descriptors - per-call environments with speculative slot kinds

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::runtime::context::Context;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::values::Value;
use crate::types::SlotKind;

/// Handle for one slot of a frame descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

fn kind_to_u8(kind: SlotKind) -> u8 {
    match kind {
        SlotKind::Unset => 0,
        SlotKind::Int => 1,
        SlotKind::Bool => 2,
        SlotKind::Object => 3,
    }
}

fn kind_from_u8(raw: u8) -> SlotKind {
    match raw {
        0 => SlotKind::Unset,
        1 => SlotKind::Int,
        2 => SlotKind::Bool,
        _ => SlotKind::Object,
    }
}

/// Layout shared by every frame built from the same lambda: slot names
/// (when the front end allocates by identifier) and the per-slot
/// speculative kind.
///
/// Kinds are shared state: all frames of one descriptor promote and observe
/// the same kind cells. A kind is promoted at most once; mismatching later
/// writes leave it alone and box instead.
#[derive(Debug)]
pub struct FrameDescriptor {
    names: IndexMap<String, usize>,
    kinds: Vec<AtomicU8>,
}

impl FrameDescriptor {
    pub fn new() -> FrameDescriptor {
        FrameDescriptor {
            names: IndexMap::new(),
            kinds: Vec::new(),
        }
    }

    /// Descriptor of `len` anonymous slots, for bodies built at the foreign
    /// boundary where no identifiers exist.
    pub fn sized(len: usize) -> FrameDescriptor {
        FrameDescriptor {
            names: IndexMap::new(),
            kinds: (0..len).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    /// Registers a named slot. Names are unique per descriptor.
    pub fn add_slot(&mut self, name: &str) -> EvalResult<SlotId> {
        if self.names.contains_key(name) {
            return Err(EvalError::Internal(format!("duplicate slot name `{name}`")));
        }
        let slot = SlotId(self.kinds.len());
        self.names.insert(name.to_string(), slot.0);
        self.kinds.push(AtomicU8::new(0));
        Ok(slot)
    }

    pub fn slot_named(&self, name: &str) -> Option<SlotId> {
        self.names.get(name).copied().map(SlotId)
    }

    /// Name of a slot, when it was registered with one.
    pub fn name(&self, slot: SlotId) -> Option<&str> {
        self.names
            .iter()
            .find(|(_, index)| **index == slot.0)
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn kind(&self, slot: SlotId) -> SlotKind {
        self.kinds
            .get(slot.0)
            .map_or(SlotKind::Unset, |cell| kind_from_u8(cell.load(Ordering::Acquire)))
    }

    /// Records the kind of a write. Returns the kind the slot ends up
    /// with: `incoming` if this write promoted the slot, otherwise whatever
    /// an earlier write recorded.
    fn promote(&self, slot: SlotId, incoming: SlotKind) -> SlotKind {
        let cell = &self.kinds[slot.0];
        if Context::global().single_threaded() {
            // uncontended path: no read-modify-write cycle needed
            let current = kind_from_u8(cell.load(Ordering::Relaxed));
            if current == SlotKind::Unset {
                cell.store(kind_to_u8(incoming), Ordering::Relaxed);
                incoming
            } else {
                current
            }
        } else {
            match cell.compare_exchange(
                kind_to_u8(SlotKind::Unset),
                kind_to_u8(incoming),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => incoming,
                Err(previous) => kind_from_u8(previous),
            }
        }
    }
}

impl Default for FrameDescriptor {
    fn default() -> FrameDescriptor {
        FrameDescriptor::new()
    }
}

/// Storage cell of one slot: unboxed when the write matched the recorded
/// kind, boxed otherwise.
#[derive(Debug, Clone, PartialEq)]
enum SlotValue {
    Empty,
    Int(i64),
    Bool(bool),
    Boxed(Value),
}

/// One call's (or one captured environment's) slot storage. Never shared
/// between concurrent calls; sharing happens only after `materialize`.
#[derive(Debug)]
pub struct Frame {
    descriptor: Arc<FrameDescriptor>,
    arguments: Vec<Value>,
    slots: Vec<SlotValue>,
}

impl Frame {
    /// Frame for a call, carrying its positional arguments.
    pub fn for_call(descriptor: Arc<FrameDescriptor>, arguments: Vec<Value>) -> Frame {
        let slots = vec![SlotValue::Empty; descriptor.len()];
        Frame {
            descriptor,
            arguments,
            slots,
        }
    }

    /// Argumentless frame, as built for captured environments.
    pub fn new(descriptor: Arc<FrameDescriptor>) -> Frame {
        Frame::for_call(descriptor, Vec::new())
    }

    pub fn descriptor(&self) -> &Arc<FrameDescriptor> {
        &self.descriptor
    }

    /// The i-th positional call argument. An out-of-range index means the
    /// preamble and the call disagree, which is an invariant fault.
    pub fn argument(&self, index: usize) -> EvalResult<&Value> {
        self.arguments.get(index).ok_or_else(|| {
            EvalError::Internal(format!(
                "argument index {index} out of range ({} supplied)",
                self.arguments.len()
            ))
        })
    }

    /// The slot write protocol: the first write promotes the slot's kind
    /// from the value's tag; a later mismatching write still succeeds but
    /// stores boxed and leaves the recorded kind alone.
    pub fn write(&mut self, slot: SlotId, value: Value) -> EvalResult<()> {
        if slot.0 >= self.slots.len() {
            return Err(EvalError::Internal(format!(
                "write to slot {slot} outside the frame's {} slots",
                self.slots.len()
            )));
        }
        let incoming = value.slot_kind();
        let recorded = self.descriptor.promote(slot, incoming);
        self.slots[slot.0] = if recorded == incoming {
            match value {
                Value::Nat(n) => SlotValue::Int(n),
                Value::Bool(b) => SlotValue::Bool(b),
                other => SlotValue::Boxed(other),
            }
        } else {
            log::trace!("slot {slot} holds kind {recorded:?}; boxing a {incoming:?} write");
            SlotValue::Boxed(value)
        };
        Ok(())
    }

    /// Generic read: whatever was last written, regardless of kind.
    pub fn read(&self, slot: SlotId) -> EvalResult<Value> {
        match self.slots.get(slot.0) {
            None => Err(EvalError::Internal(format!(
                "read of slot {slot} outside the frame's {} slots",
                self.slots.len()
            ))),
            Some(SlotValue::Empty) => Err(EvalError::UnsetSlot {
                name: self.slot_name(slot),
            }),
            Some(SlotValue::Int(n)) => Ok(Value::Nat(*n)),
            Some(SlotValue::Bool(b)) => Ok(Value::Bool(*b)),
            Some(SlotValue::Boxed(value)) => Ok(value.clone()),
        }
    }

    /// Typed read fast path; `None` is the speculation-miss retry signal,
    /// never a fault. Callers fall back to the generic read.
    pub fn read_nat(&self, slot: SlotId) -> Option<i64> {
        match self.slots.get(slot.0) {
            Some(SlotValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn read_bool(&self, slot: SlotId) -> Option<bool> {
        match self.slots.get(slot.0) {
            Some(SlotValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    fn slot_name(&self, slot: SlotId) -> String {
        match self.descriptor.name(slot) {
            Some(name) => name.to_string(),
            None => slot.to_string(),
        }
    }

    /// Freezes this frame for capture inside a closure. From then on it is
    /// read-only and may be shared across calls and threads.
    pub fn materialize(self) -> MaterializedFrame {
        MaterializedFrame(Arc::new(self))
    }
}

/// A frame captured by a closure.
#[derive(Debug, Clone)]
pub struct MaterializedFrame(Arc<Frame>);

impl MaterializedFrame {
    pub fn frame(&self) -> &Frame {
        &self.0
    }

    pub(crate) fn ptr_eq(a: &MaterializedFrame, b: &MaterializedFrame) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Deref for MaterializedFrame {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.0
    }
}

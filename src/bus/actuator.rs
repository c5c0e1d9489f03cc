use crate::payload::Payload;
use crate::rings::container::ActuatorHandle;
use crate::types::SchemaId;

/// Abstract boundary port into the external simulation process. Implementations must
/// be synchronous, best-effort, and may fail without side effects. See spec.md 6
/// "MemoryActuator port". The DLL-injection / pattern-scanning / hooking machinery that
/// would sit behind a real implementation is explicitly out of scope (spec.md 1).
pub trait MemoryActuator {
    fn read_field(&self, handle: ActuatorHandle, schema: SchemaId) -> Result<Payload, String>;
    fn write_field(
        &mut self,
        handle: ActuatorHandle,
        schema: SchemaId,
        payload: Payload,
    ) -> Result<(), String>;
    fn handle_valid(&self, handle: ActuatorHandle) -> bool;
}

/// In-memory fake used by tests and the `fakes`-feature demos. See spec.md 9
/// ("Provide an in-memory fake implementation for tests").
#[derive(Default)]
pub struct FakeMemoryActuator {
    fields: std::collections::HashMap<(ActuatorHandle, SchemaId), Payload>,
    valid_handles: std::collections::HashSet<ActuatorHandle>,
    pub fail_next_write: bool,
    pub fail_next_read: bool,
}

impl FakeMemoryActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_valid(&mut self, handle: ActuatorHandle) {
        self.valid_handles.insert(handle);
    }
}

impl MemoryActuator for FakeMemoryActuator {
    fn read_field(&self, handle: ActuatorHandle, schema: SchemaId) -> Result<Payload, String> {
        if self.fail_next_read {
            return Err("simulated read failure".to_string());
        }
        self.fields
            .get(&(handle, schema))
            .copied()
            .ok_or_else(|| format!("no value cached for handle {handle:?} field {schema:?}"))
    }

    fn write_field(
        &mut self,
        handle: ActuatorHandle,
        schema: SchemaId,
        payload: Payload,
    ) -> Result<(), String> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err("simulated write failure".to_string());
        }
        self.fields.insert((handle, schema), payload);
        Ok(())
    }

    fn handle_valid(&self, handle: ActuatorHandle) -> bool {
        self.valid_handles.contains(&handle)
    }
}

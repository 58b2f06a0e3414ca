use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use crate::client::ClientCallbacks;
use crate::ids::{ClientID, GroupID, MessageID, Version};
use crate::message::Message;
use crate::shift::ShiftContext;
use crate::table::Table;
use crate::update::Bookkeeping;

/// Whether the coordinator drains its pending queue on every `receive`, or
/// only when the host calls `process` explicitly. Per §5 this is purely a
/// batching knob — it changes nothing about ordering or outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    Immediate,
    Manual,
}

struct HistoryEntry {
    message: Message,
    bookkeeping: Bookkeeping,
}

/// The authoritative coordinator. Owns the table and the total order of
/// accepted edits; every connected client's mirror is kept in lockstep by
/// replaying the same broadcasts in the same order.
pub struct Coordinator {
    table: Table,
    /// `history[i]` is the accepted update at version `i + 1`.
    history: Vec<HistoryEntry>,
    pending: VecDeque<Message>,
    failed_groups: HashSet<GroupID>,
    clients: HashMap<ClientID, Rc<RefCell<dyn ClientCallbacks>>>,
    mode: ProcessingMode,
}

impl Coordinator {
    pub fn new(mode: ProcessingMode) -> Self {
        Self {
            table: Table::new(),
            history: Vec::new(),
            pending: VecDeque::new(),
            failed_groups: HashSet::new(),
            clients: HashMap::new(),
            mode,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn current_version(&self) -> Version {
        self.history.len() as Version
    }

    /// Registers `handle` as connected and immediately delivers it a
    /// snapshot sync — the same `sync` callback used for any later resync.
    pub fn connect(&mut self, id: ClientID, handle: Rc<RefCell<dyn ClientCallbacks>>) {
        log::debug!("client {id} connected at version {}", self.current_version());
        let snapshot = self.table.snapshot();
        let version = self.current_version();
        self.clients.insert(id, handle.clone());
        handle.borrow_mut().sync(snapshot, version);
    }

    pub fn disconnect(&mut self, id: &ClientID) {
        self.clients.remove(id);
        log::debug!("client {id} disconnected");
    }

    /// Enqueues `message`. In `Immediate` mode this also drains the queue;
    /// in `Manual` mode the host must call `process` itself.
    pub fn receive(&mut self, message: Message) {
        self.pending.push_back(message);
        if self.mode == ProcessingMode::Immediate {
            self.process();
        }
    }

    /// Drains the pending queue to completion, in FIFO arrival order. A
    /// message's resulting version equals its position in the accepted
    /// subsequence — no reordering, batching, or priority.
    pub fn process(&mut self) {
        while let Some(message) = self.pending.pop_front() {
            self.process_one(message);
        }
    }

    fn process_one(&mut self, mut message: Message) {
        if self.failed_groups.contains(&message.group_id) {
            log::debug!(
                "dropping message {} — group {} already failed",
                message.message_id,
                message.group_id
            );
            return;
        }

        if message.update.needs_transform() {
            let ctx = self.shift_context_since(message.version);
            if !message.update.transform(&ctx) {
                self.reject(message);
                return;
            }
        }

        match message.update.apply(&mut self.table) {
            Some(bookkeeping) => {
                let new_version = self.current_version() + 1;
                message.version = new_version;
                log::debug!("accepted message {} at version {new_version}", message.message_id);
                self.history.push(HistoryEntry { message: message.clone(), bookkeeping });
                self.broadcast_accepted(message);
            }
            None => self.reject(message),
        }
    }

    /// Folds every accepted update strictly after `baseline_version` into a
    /// fresh shift context, so a stale positional index can be rewritten
    /// into the coordinate space of the current table.
    fn shift_context_since(&self, baseline_version: Version) -> ShiftContext {
        let mut ctx = ShiftContext::new();
        for entry in &self.history[baseline_version as usize..] {
            entry.message.update.shift(entry.bookkeeping, &mut ctx);
        }
        ctx
    }

    fn reject(&mut self, message: Message) {
        self.failed_groups.insert(message.group_id.clone());
        log::warn!("rejected message {} (group {})", message.message_id, message.group_id);
        self.broadcast_rejected(message.message_id, message.group_id);
    }

    fn broadcast_accepted(&mut self, message: Message) {
        let mut dead = Vec::new();
        for (id, handle) in &self.clients {
            if let Err(err) = handle.borrow_mut().accepted(message.clone()) {
                log::error!("client {id} violated protocol on accepted(): {err}; disconnecting it");
                dead.push(id.clone());
            }
        }
        for id in dead {
            self.clients.remove(&id);
        }
    }

    fn broadcast_rejected(&mut self, message_id: MessageID, group_id: GroupID) {
        for handle in self.clients.values() {
            handle.borrow_mut().rejected(message_id.clone(), group_id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ColumnID, RowID};
    use crate::update::Update;
    use crate::value::CellType;

    fn accept(coord: &mut Coordinator, version: Version, group: GroupID, update: Update) {
        coord.receive(Message::new(version, group, update));
    }

    #[test]
    fn versions_advance_with_each_acceptance() {
        let mut coord = Coordinator::new(ProcessingMode::Immediate);
        let group = GroupID::fresh();
        accept(&mut coord, 0, group.clone(), Update::CreateRow { row_id: RowID::new("r1") });
        assert_eq!(coord.current_version(), 1);
        accept(
            &mut coord,
            1,
            group,
            Update::CreateColumn { column_id: ColumnID::new("c1"), cell_type: CellType::Text },
        );
        assert_eq!(coord.current_version(), 2);
        assert!(coord.table().has_column(&ColumnID::new("c1")));
    }

    #[test]
    fn dependent_group_is_dropped_after_a_failure() {
        let mut coord = Coordinator::new(ProcessingMode::Immediate);
        let group = GroupID::fresh();
        // Fails: column doesn't exist yet.
        accept(
            &mut coord,
            0,
            group.clone(),
            Update::UpdateTextCellValue {
                row_id: RowID::new("r1"),
                column_id: ColumnID::new("c1"),
                value: "x".into(),
            },
        );
        assert_eq!(coord.current_version(), 0);
        // Same group, would otherwise succeed — must be silently dropped.
        accept(&mut coord, 0, group, Update::CreateRow { row_id: RowID::new("r1") });
        assert_eq!(coord.current_version(), 0);
    }
}

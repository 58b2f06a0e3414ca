use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::coordinator::Coordinator;
use crate::error::EngineError;
use crate::ids::{ClientID, ColumnID, GroupID, Index, MessageID, RowID, Version};
use crate::message::Message;
use crate::table::Table;
use crate::update::Update;
use crate::value::CellType;

/// Outbound callbacks the coordinator delivers to a connected client.
/// Implemented by [`Client`]; kept as a trait so a host can substitute a
/// test double without a real coordinator.
pub trait ClientCallbacks {
    /// Replace the mirror wholesale — delivered on connect, and on any later
    /// resync. Rotates the client's group id if the new baseline is ahead.
    fn sync(&mut self, table: Table, version: Version);

    /// A message this client or a peer authored was accepted. `Err` signals
    /// a protocol violation (delivered out of order) — fatal for this client.
    fn accepted(&mut self, message: Message) -> Result<(), EngineError>;

    /// A message was rejected. No mandatory mirror change: unacknowledged
    /// edits were never applied locally in the first place.
    fn rejected(&mut self, message_id: MessageID, group_id: GroupID);
}

/// A client node: a mirror of the last-synced authoritative state, an
/// outbox of messages accumulated while offline, and the dependency group
/// the client's next local edits belong to.
pub struct Client {
    coordinator: Rc<RefCell<Coordinator>>,
    id: ClientID,
    mirror: Table,
    outbox: VecDeque<Message>,
    version: Version,
    group_id: GroupID,
    online: bool,
}

impl Client {
    /// Begins offline with an empty mirror, version 0, and a fresh group id.
    /// If `online` is set, immediately comes online.
    pub fn new(coordinator: Rc<RefCell<Coordinator>>, online: bool) -> Rc<RefCell<Client>> {
        let client = Rc::new(RefCell::new(Client {
            coordinator,
            id: ClientID::fresh(),
            mirror: Table::new(),
            outbox: VecDeque::new(),
            version: 0,
            group_id: GroupID::fresh(),
            online: false,
        }));
        if online {
            Client::come_online(&client);
        }
        client
    }

    pub fn id(&self) -> &ClientID {
        &self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn group_id(&self) -> &GroupID {
        &self.group_id
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn outbox_len(&self) -> usize {
        self.outbox.len()
    }

    /// Registers with the coordinator (which syncs this client, possibly
    /// rotating its group id), then flushes the outbox to the server in
    /// enqueued order.
    pub fn come_online(this: &Rc<RefCell<Client>>) {
        let (id, coordinator) = {
            let c = this.borrow();
            (c.id.clone(), c.coordinator.clone())
        };
        let handle: Rc<RefCell<dyn ClientCallbacks>> = this.clone();
        coordinator.borrow_mut().connect(id, handle);

        let pending: Vec<Message> = {
            let mut c = this.borrow_mut();
            c.outbox.drain(..).collect()
        };
        for message in pending {
            coordinator.borrow_mut().receive(message);
        }
        this.borrow_mut().online = true;
    }

    /// Tells the server to disconnect this client. Any outbox that
    /// accumulates afterwards waits for the next `come_online`.
    pub fn go_offline(this: &Rc<RefCell<Client>>) {
        let (id, coordinator) = {
            let c = this.borrow();
            (c.id.clone(), c.coordinator.clone())
        };
        coordinator.borrow_mut().disconnect(&id);
        this.borrow_mut().online = false;
    }

    /// The materialized view this client exposes to its host: the mirror if
    /// online, or the mirror with the outbox best-effort replayed on top of
    /// a clone if offline.
    pub fn get_data(this: &Rc<RefCell<Client>>) -> String {
        this.borrow().materialize()
    }

    pub fn create_row(this: &Rc<RefCell<Client>>, row_id: RowID) {
        Self::issue(this, Update::CreateRow { row_id });
    }

    pub fn destroy_row(this: &Rc<RefCell<Client>>, row_id: RowID) {
        Self::issue(this, Update::DestroyRow { row_id });
    }

    pub fn move_row(this: &Rc<RefCell<Client>>, row_id: RowID, target_index: Index) {
        Self::issue(this, Update::MoveRow { row_id, target_index });
    }

    pub fn create_column(this: &Rc<RefCell<Client>>, column_id: ColumnID, cell_type: CellType) {
        Self::issue(this, Update::CreateColumn { column_id, cell_type });
    }

    pub fn destroy_column(this: &Rc<RefCell<Client>>, column_id: ColumnID) {
        Self::issue(this, Update::DestroyColumn { column_id });
    }

    pub fn update_column_type(this: &Rc<RefCell<Client>>, column_id: ColumnID, cell_type: CellType) {
        Self::issue(this, Update::UpdateColumnType { column_id, cell_type });
    }

    pub fn update_text_cell_value(
        this: &Rc<RefCell<Client>>,
        row_id: RowID,
        column_id: ColumnID,
        value: impl Into<String>,
    ) {
        Self::issue(this, Update::UpdateTextCellValue { row_id, column_id, value: value.into() });
    }

    pub fn update_number_cell_value(this: &Rc<RefCell<Client>>, row_id: RowID, column_id: ColumnID, value: f64) {
        Self::issue(this, Update::UpdateNumberCellValue { row_id, column_id, value });
    }

    /// Wraps `update` in a message baselined at the client's current
    /// version and group. Online, it goes straight to the coordinator;
    /// offline, it waits in the outbox. The mirror is never touched here —
    /// only `accepted` mutates it.
    fn issue(this: &Rc<RefCell<Client>>, update: Update) {
        let (message, online, coordinator) = {
            let c = this.borrow();
            (Message::new(c.version, c.group_id.clone(), update), c.online, c.coordinator.clone())
        };
        if online {
            coordinator.borrow_mut().receive(message);
        } else {
            this.borrow_mut().outbox.push_back(message);
        }
    }

    fn materialize(&self) -> String {
        if self.online {
            self.mirror.to_json_string()
        } else {
            let mut clone = self.mirror.clone();
            for message in &self.outbox {
                // Best-effort: a conflict here would also fail at the server.
                let _ = message.update.apply(&mut clone);
            }
            clone.to_json_string()
        }
    }
}

impl ClientCallbacks for Client {
    fn sync(&mut self, table: Table, version: Version) {
        self.mirror = table;
        if version > self.version {
            self.group_id = GroupID::fresh();
        }
        self.version = version;
    }

    fn accepted(&mut self, message: Message) -> Result<(), EngineError> {
        if message.version != self.version + 1 {
            return Err(EngineError::Protocol("accepted message delivered out of order"));
        }
        // Must succeed by construction: the coordinator already validated
        // and, if needed, transformed this update before accepting it.
        if message.update.apply(&mut self.mirror).is_none() {
            return Err(EngineError::Protocol("server-accepted update failed to replay locally"));
        }
        self.version = message.version;
        self.group_id = GroupID::fresh();
        Ok(())
    }

    fn rejected(&mut self, message_id: MessageID, group_id: GroupID) {
        log::debug!("client {} informed: message {message_id} (group {group_id}) was rejected", self.id);
    }
}

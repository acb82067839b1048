//! Handler results: outgoing messages, an optional code replacement and
//! key-value attributes that the runtime logs.

use serde::Serialize;

use jdao_types::account::StateInit;
use jdao_types::cell::Cell;
use jdao_types::error::DaoError;
use jdao_types::message::MessageBody;
use jdao_types::primitives::{Address, Coins};

/// The result type returned by [`Contract::receive`](crate::Contract::receive).
pub type ContractResult = Result<Response, DaoError>;

/// How much value an outgoing message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendValue {
    /// A fixed amount taken from the sender's balance.
    Coins(Coins),
    /// Whatever value the inbound message brought in.
    CarryInbound,
}

/// A message queued by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutMessage {
    pub dest: Address,
    pub value: SendValue,
    pub bounce: bool,
    pub body: Cell,
    /// Deploys `dest` if it is not active yet and the init derives `dest`.
    pub state_init: Option<StateInit>,
}

impl OutMessage {
    /// Encode a typed body for `dest`.
    pub fn new<M: MessageBody>(dest: Address, value: SendValue, body: &M) -> Result<Self, DaoError> {
        Ok(Self::raw(dest, value, body.to_cell()?))
    }

    /// Message with an already encoded body.
    pub fn raw(dest: Address, value: SendValue, body: Cell) -> Self {
        OutMessage {
            dest,
            value,
            bounce: false,
            body,
            state_init: None,
        }
    }

    pub fn with_state_init(mut self, init: StateInit) -> Self {
        self.state_init = Some(init);
        self
    }

    pub fn with_bounce(mut self, bounce: bool) -> Self {
        self.bounce = bounce;
        self
    }
}

/// A key-value attribute included in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

/// What a successful handler asks the runtime to do.
///
/// ```ignore
/// Ok(Response::with_action("vote")
///     .add_u128("weight", weight)
///     .send(OutMessage::new(keeper, SendValue::CarryInbound, &request)?))
/// ```
#[derive(Debug, Clone, Default)]
pub struct Response {
    messages: Vec<OutMessage>,
    new_code: Option<Cell>,
    attributes: Vec<Attribute>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a response with an "action" attribute pre-set.
    pub fn with_action(action: impl Into<String>) -> Self {
        Self::new().add_attribute("action", action)
    }

    pub fn add_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn add_address(self, key: impl Into<String>, addr: &Address) -> Self {
        self.add_attribute(key, addr.short())
    }

    pub fn add_u128(self, key: impl Into<String>, value: u128) -> Self {
        self.add_attribute(key, format!("{value}"))
    }

    /// Queue an outgoing message.
    pub fn send(mut self, msg: OutMessage) -> Self {
        self.messages.push(msg);
        self
    }

    /// Replace the contract code once the transaction commits.
    pub fn set_code(mut self, code: Cell) -> Self {
        self.new_code = Some(code);
        self
    }

    pub fn messages(&self) -> &[OutMessage] {
        &self.messages
    }

    pub fn new_code(&self) -> Option<&Cell> {
        self.new_code.as_ref()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// The "action" attribute, if set.
    pub fn action(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == "action")
            .map(|a| a.value.as_str())
    }

    pub fn into_parts(self) -> (Vec<OutMessage>, Option<Cell>, Vec<Attribute>) {
        (self.messages, self.new_code, self.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jdao_types::message::Excesses;

    #[test]
    fn test_builder_collects_messages_and_attributes() {
        let dest = Address::basechain([1; 32]);
        let msg = OutMessage::new(dest, SendValue::CarryInbound, &Excesses { query_id: 3 }).unwrap();
        let resp = Response::with_action("excesses")
            .add_u128("amount", 5)
            .send(msg.clone());
        assert_eq!(resp.action(), Some("excesses"));
        assert_eq!(resp.messages(), &[msg]);
        assert_eq!(resp.attributes()[1].value, "5");
        assert!(resp.new_code().is_none());
    }

    #[test]
    fn test_set_code() {
        let code = Cell::from_hash([7; 32]);
        let (messages, new_code, _) = Response::new().set_code(code.clone()).into_parts();
        assert!(messages.is_empty());
        assert_eq!(new_code, Some(code));
    }
}

use crate::domain::OrderStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum OrderAction {
    /// Admin override; any status may follow any other.
    SetStatus(OrderStatus),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderActionResult {
    /// The status the order had before the change.
    SetStatus(Option<OrderStatus>),
}

use crate::application::check_in::CheckInOptions;
use crate::application::engine::LedgerCommand;
use crate::application::payments::PaymentRequest;
use crate::application::settlement::SettleRequest;
use crate::domain::money::Money;
use crate::error::{LedgerError, Result};
use serde::Deserialize;
use std::io::Read;

const DEFAULT_ACTOR: &str = "cli";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOp {
    Transfer,
    UndoTransfer,
    BulkTransfer,
    Quantity,
    Remove,
    BulkRemove,
    Pay,
    Void,
    Refund,
    CheckIn,
    UndoCheckIn,
    CheckInFlight,
    CheckInAll,
    Settle,
    SettleAll,
}

/// One row of a command feed.
///
/// Columns not used by an op are left empty. `items` is a `;`-separated id list: line items
/// for most ops, players for `check_in_flight`. `target` is the destination player of a
/// transfer or the transaction number of a void or refund. `note` carries the reason of a
/// void or refund and the notes of a check-in.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRecord {
    pub op: CommandOp,
    #[serde(default)]
    pub club: Option<String>,
    #[serde(default)]
    pub tee_time: Option<String>,
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub items: Option<String>,
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub quantity: Option<u8>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub skip_validation: Option<bool>,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl CommandRecord {
    pub fn into_command(self) -> Result<LedgerCommand> {
        let op = self.op;
        let need = |value: Option<String>, column: &str| {
            value.filter(|v| !v.is_empty()).ok_or_else(|| {
                LedgerError::ValidationError(format!("{:?} requires column `{}`", op, column))
            })
        };
        let items = split_ids(self.items.as_deref());
        let actor = self.actor.unwrap_or_else(|| DEFAULT_ACTOR.to_string());
        let options = CheckInOptions {
            skip_validation: self.skip_validation.unwrap_or(false),
            notes: self.note.clone(),
        };

        let command = match op {
            CommandOp::Transfer => LedgerCommand::Transfer {
                line_item_id: single(op, items)?,
                from_player_id: need(self.player, "player")?,
                to_player_id: need(self.target, "target")?,
                actor,
            },
            CommandOp::UndoTransfer => LedgerCommand::UndoTransfer {
                line_item_id: single(op, items)?,
                actor,
            },
            CommandOp::BulkTransfer => LedgerCommand::BulkTransfer {
                line_item_ids: at_least_one(op, items)?,
                to_player_id: need(self.target, "target")?,
                actor,
            },
            CommandOp::Quantity => LedgerCommand::UpdateQuantity {
                line_item_id: single(op, items)?,
                quantity: self.quantity.ok_or_else(|| {
                    LedgerError::ValidationError(format!("{:?} requires column `quantity`", op))
                })?,
            },
            CommandOp::Remove => LedgerCommand::Remove {
                line_item_id: single(op, items)?,
            },
            CommandOp::BulkRemove => LedgerCommand::BulkRemove {
                line_item_ids: at_least_one(op, items)?,
            },
            CommandOp::Pay => LedgerCommand::Pay(PaymentRequest {
                club_id: need(self.club, "club")?,
                line_item_ids: at_least_one(op, items)?,
                amount: amount(op, self.amount)?,
                payment_method_id: need(self.method, "method")?,
                paid_by: actor,
                reference: self.reference,
                idempotency_key: self.key,
            }),
            CommandOp::Void => LedgerCommand::Void {
                club_id: need(self.club, "club")?,
                transaction_number: need(self.target, "target")?,
                reason: need(self.note, "note")?,
                actor,
            },
            CommandOp::Refund => LedgerCommand::Refund {
                club_id: need(self.club, "club")?,
                transaction_number: need(self.target, "target")?,
                amount: amount(op, self.amount)?,
                reason: need(self.note, "note")?,
                actor,
            },
            CommandOp::CheckIn => LedgerCommand::CheckIn {
                player_id: need(self.player, "player")?,
                actor,
                options,
            },
            CommandOp::UndoCheckIn => LedgerCommand::UndoCheckIn {
                player_id: need(self.player, "player")?,
                actor,
            },
            CommandOp::CheckInFlight => LedgerCommand::CheckInFlight {
                tee_time_id: need(self.tee_time, "tee_time")?,
                player_ids: at_least_one(op, items)?,
                actor,
                options,
            },
            CommandOp::CheckInAll => LedgerCommand::CheckInAll {
                tee_time_id: need(self.tee_time, "tee_time")?,
                actor,
                options,
            },
            CommandOp::Settle => LedgerCommand::Settle(SettleRequest {
                slot_id: need(self.player, "player")?,
                payment_method_id: need(self.method, "method")?,
                actor,
                line_item_ids: (!items.is_empty()).then_some(items),
                reference: self.reference,
            }),
            CommandOp::SettleAll => LedgerCommand::SettleAll {
                tee_time_id: need(self.tee_time, "tee_time")?,
                payment_method_id: need(self.method, "method")?,
                actor,
            },
        };
        Ok(command)
    }
}

fn split_ids(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn at_least_one(op: CommandOp, ids: Vec<String>) -> Result<Vec<String>> {
    if ids.is_empty() {
        return Err(LedgerError::ValidationError(format!(
            "{:?} requires column `items`",
            op
        )));
    }
    Ok(ids)
}

fn single(op: CommandOp, ids: Vec<String>) -> Result<String> {
    let mut ids = at_least_one(op, ids)?;
    if ids.len() > 1 {
        return Err(LedgerError::ValidationError(format!(
            "{:?} takes exactly one line item, got {}",
            op,
            ids.len()
        )));
    }
    Ok(ids.remove(0))
}

fn amount(op: CommandOp, amount: Option<Money>) -> Result<Money> {
    amount.ok_or_else(|| {
        LedgerError::ValidationError(format!("{:?} requires column `amount`", op))
    })
}

/// Reads ledger commands from a CSV source.
///
/// Fields are trimmed and rows may stop early; missing trailing columns read as empty.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily parses rows. A bad row yields an error and the iterator moves on.
    pub fn commands(self) -> impl Iterator<Item = Result<LedgerCommand>> {
        self.reader
            .into_deserialize::<CommandRecord>()
            .map(|row| row.map_err(LedgerError::from).and_then(CommandRecord::into_command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str = "op,club,tee_time,player,target,items,amount,quantity,method,reference,key,skip_validation,actor,note";

    fn parse(rows: &str) -> Vec<Result<LedgerCommand>> {
        let data = format!("{}\n{}", HEADER, rows);
        CommandReader::new(data.as_bytes()).commands().collect()
    }

    #[test]
    fn test_pay_row() {
        let results = parse("pay, club-1,,,, li-1;li-2, 214.00,, card, AUTH-1, till-1,, pro,");
        let command = results[0].as_ref().unwrap();
        match command {
            LedgerCommand::Pay(req) => {
                assert_eq!(req.line_item_ids, vec!["li-1", "li-2"]);
                assert_eq!(req.amount, Money::new(dec!(214)));
                assert_eq!(req.reference.as_deref(), Some("AUTH-1"));
                assert_eq!(req.idempotency_key.as_deref(), Some("till-1"));
                assert_eq!(req.paid_by, "pro");
            }
            other => panic!("expected pay, got {:?}", other),
        }
    }

    #[test]
    fn test_short_row_defaults_actor() {
        let results = parse("check_in,,,p1");
        assert_eq!(
            results[0].as_ref().unwrap(),
            &LedgerCommand::CheckIn {
                player_id: "p1".to_string(),
                actor: DEFAULT_ACTOR.to_string(),
                options: CheckInOptions::default(),
            }
        );
    }

    #[test]
    fn test_settle_without_items_pays_everything() {
        let results = parse("settle,,,p2,,,,,cash");
        match results[0].as_ref().unwrap() {
            LedgerCommand::Settle(req) => assert!(req.line_item_ids.is_none()),
            other => panic!("expected settle, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_column_and_unknown_op() {
        let results = parse("void,club-1,,,TXN-2026-00001\nexplode,club-1");
        assert!(matches!(results[0], Err(LedgerError::ValidationError(_))));
        assert!(matches!(results[1], Err(LedgerError::CsvError(_))));
    }

    #[test]
    fn test_transfer_takes_one_item() {
        let results = parse("transfer,,,p1,p2,li-1;li-2");
        assert!(matches!(results[0], Err(LedgerError::ValidationError(_))));
    }
}

use derive_more::Display;

use super::{AddressAction, HouseCode, LevelAction, UnitId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEvent {
    AddressUnit { unit: UnitId, action: AddressAction },
    LevelChange { action: LevelAction },
    Rejected { reason: RejectReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum RejectReason {
    #[display("too short ({_0} fields)")]
    TooShort(usize),

    #[display("not a received packet: {_0:?}")]
    NotReceived(String),

    #[display("unknown medium {_0:?}")]
    UnknownMedium(String),

    #[display("missing function marker, found {_0:?}")]
    MissingFunction(String),

    #[display("house not monitored")]
    HouseNotMonitored,

    #[display("invalid unit in {_0:?}")]
    InvalidUnit(String),

    #[display("unsupported function {_0:?}")]
    UnsupportedFunction(String),

    #[display("unknown address type {_0:?}")]
    UnknownAddressType(String),
}

/// Parses one line of controller monitor output, e.g.
/// `02/20 18:53:40 Rx RF HouseUnit: J3 Func: On`.
///
/// Fields are separated by single spaces. Power-line (`PL`) packets are assumed to share the
/// framing of RF packets; this has only been verified against RF receivers.
pub fn parse(line: &str, house: HouseCode) -> ParsedEvent {
    match parse_fields(line, house) {
        Ok(event) => event,
        Err(reason) => ParsedEvent::Rejected { reason },
    }
}

fn parse_fields(line: &str, house: HouseCode) -> Result<ParsedEvent, RejectReason> {
    let line = line.trim_end_matches(['\r', '\n']);
    let fields: Vec<&str> = line.split(' ').collect();

    let [_date, _time, direction, medium, address_type, address, marker, function, ..] = fields.as_slice() else {
        return Err(RejectReason::TooShort(fields.len()));
    };

    if *direction != "Rx" {
        return Err(RejectReason::NotReceived(direction.to_string()));
    }

    if !matches!(*medium, "RF" | "PL") {
        return Err(RejectReason::UnknownMedium(medium.to_string()));
    }

    if *marker != "Func:" {
        return Err(RejectReason::MissingFunction(marker.to_string()));
    }

    let mut address_chars = address.chars();
    if address_chars.next() != Some(house.letter()) {
        return Err(RejectReason::HouseNotMonitored);
    }

    match *address_type {
        "HouseUnit:" => {
            let unit = UnitId::parse(address_chars.as_str()).ok_or_else(|| RejectReason::InvalidUnit(address.to_string()))?;

            let action = match *function {
                "On" => AddressAction::On,
                "Off" => AddressAction::Off,
                other => return Err(RejectReason::UnsupportedFunction(other.to_owned())),
            };

            Ok(ParsedEvent::AddressUnit { unit, action })
        }
        "House:" => {
            let action = match *function {
                "Dim" => LevelAction::Dim,
                "Bright" => LevelAction::Bright,
                other => return Err(RejectReason::UnsupportedFunction(other.to_owned())),
            };

            Ok(ParsedEvent::LevelChange { action })
        }
        other => Err(RejectReason::UnknownAddressType(other.to_owned())),
    }
}

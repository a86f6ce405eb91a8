//! Normalization of producer payloads into match metadata and insertable rows.
//!
//! Row filter policy: a row is kept only when `quantity > 0` and `price_min > 0`.
//! Rows with any unparseable numeric field fail the filter. Dropped rows are
//! counted, never reported as errors.

use tracing::debug;

use crate::error::{AppError, Result};
use crate::types::{IngestRequest, NewMatch, NewTicket, NumericField, TicketPayload};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterStats {
    pub received: usize,
    pub kept: usize,
    pub dropped_unparseable: usize,
    pub dropped_no_quantity: usize,
    pub dropped_no_price: usize,
}

impl FilterStats {
    pub fn dropped(&self) -> usize {
        self.dropped_unparseable + self.dropped_no_quantity + self.dropped_no_price
    }
}

enum Rejection {
    Unparseable,
    NoQuantity,
    NoPrice,
}

/// Split an ingest request into match metadata and raw ticket rows.
///
/// Accepts both `{match, tickets}` and the flat `{resultados}` shape. Fails
/// before anything is written when the title or the ticket list is missing.
pub fn into_batch(req: IngestRequest) -> Result<(NewMatch, Vec<TicketPayload>)> {
    let (new_match, tickets) = match (req.event, req.tickets, req.resultados) {
        (Some(m), tickets, _) => {
            let new_match = NewMatch {
                title: m.title.unwrap_or_default(),
                venue: m.stadium.unwrap_or_default(),
                date: m.fecha.unwrap_or_default(),
                home_team: m.local.unwrap_or_default(),
                away_team: m.visitante.unwrap_or_default(),
                source_link: m.link.unwrap_or_default(),
            };
            (new_match, tickets.unwrap_or_default())
        }
        (None, _, Some(rows)) => {
            let Some(first) = rows.first() else {
                return Err(AppError::Validation("no tickets in batch".to_string()));
            };
            let new_match = NewMatch {
                title: first.title.clone().unwrap_or_default(),
                venue: first.estadium.clone().unwrap_or_default(),
                date: first.fecha.clone().unwrap_or_default(),
                ..NewMatch::default()
            };
            (new_match, rows.into_iter().map(|r| r.ticket).collect())
        }
        (None, _, None) => {
            return Err(AppError::Validation("missing match metadata".to_string()));
        }
    };

    if tickets.is_empty() {
        return Err(AppError::Validation("no tickets in batch".to_string()));
    }
    validate_match(&new_match)?;
    Ok((new_match, tickets))
}

pub fn validate_match(m: &NewMatch) -> Result<()> {
    if m.title.trim().is_empty() {
        return Err(AppError::Validation("match title is required".to_string()));
    }
    Ok(())
}

/// Apply numeric parsing and the row filter. Order of surviving rows is preserved.
pub fn normalize_tickets(tickets: &[TicketPayload]) -> (Vec<NewTicket>, FilterStats) {
    let mut stats = FilterStats { received: tickets.len(), ..FilterStats::default() };
    let mut kept = Vec::with_capacity(tickets.len());

    for t in tickets {
        match normalize_ticket(t) {
            Ok(ticket) => kept.push(ticket),
            Err(Rejection::Unparseable) => stats.dropped_unparseable += 1,
            Err(Rejection::NoQuantity) => stats.dropped_no_quantity += 1,
            Err(Rejection::NoPrice) => stats.dropped_no_price += 1,
        }
    }

    stats.kept = kept.len();
    if stats.dropped() > 0 {
        debug!(
            received = stats.received,
            unparseable = stats.dropped_unparseable,
            no_quantity = stats.dropped_no_quantity,
            no_price = stats.dropped_no_price,
            "[FILTER] dropped {} of {} ticket rows",
            stats.dropped(),
            stats.received,
        );
    }
    (kept, stats)
}

fn normalize_ticket(t: &TicketPayload) -> std::result::Result<NewTicket, Rejection> {
    let price_min = t.precio_min.as_ref().and_then(parse_number);
    let price_max = t.precio_max.as_ref().and_then(parse_number);
    let quantity = t.cantidad.as_ref().and_then(parse_quantity);

    let (Some(price_min), Some(price_max), Some(quantity)) = (price_min, price_max, quantity) else {
        return Err(Rejection::Unparseable);
    };
    if quantity <= 0 {
        return Err(Rejection::NoQuantity);
    }
    if price_min <= 0.0 {
        return Err(Rejection::NoPrice);
    }

    Ok(NewTicket {
        category: t.categoria.clone().unwrap_or_default(),
        price_min,
        price_max,
        quantity,
    })
}

/// Parse a price. Text may carry thousands separators: `"1,234.50"` → `1234.5`.
/// Non-finite values count as unparseable.
pub fn parse_number(field: &NumericField) -> Option<f64> {
    let v = match field {
        NumericField::Number(n) => *n,
        NumericField::Text(s) => strip_separators(s).parse::<f64>().ok()?,
        NumericField::Other(_) => return None,
    };
    v.is_finite().then_some(v)
}

/// Parse a quantity. Integral floats (`3.0`, `"3.0"`) are accepted, fractional ones are not.
pub fn parse_quantity(field: &NumericField) -> Option<i64> {
    let v = match field {
        NumericField::Number(n) => *n,
        NumericField::Text(s) => {
            let cleaned = strip_separators(s);
            if let Ok(n) = cleaned.parse::<i64>() {
                return Some(n);
            }
            cleaned.parse::<f64>().ok()?
        }
        NumericField::Other(_) => return None,
    };
    (v.is_finite() && v.fract() == 0.0).then_some(v as i64)
}

fn strip_separators(s: &str) -> String {
    s.trim().chars().filter(|c| *c != ',' && !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LegacyTicketPayload, MatchPayload};

    fn text(s: &str) -> Option<NumericField> {
        Some(NumericField::Text(s.to_string()))
    }

    fn num(n: f64) -> Option<NumericField> {
        Some(NumericField::Number(n))
    }

    fn ticket(qty: f64, price_min: f64) -> TicketPayload {
        TicketPayload {
            categoria: Some("Category 1".to_string()),
            precio_min: num(price_min),
            precio_max: num(price_min + 10.0),
            cantidad: num(qty),
        }
    }

    #[test]
    fn thousands_separators_are_tolerated() {
        assert_eq!(parse_number(&NumericField::Text("1,234".into())), Some(1234.0));
        assert_eq!(parse_number(&NumericField::Text(" 12,345.75 ".into())), Some(12345.75));
        assert_eq!(parse_quantity(&NumericField::Text("1,200".into())), Some(1200));
    }

    #[test]
    fn garbage_and_non_finite_are_unparseable() {
        assert_eq!(parse_number(&NumericField::Text("n/a".into())), None);
        assert_eq!(parse_number(&NumericField::Text("NaN".into())), None);
        assert_eq!(parse_number(&NumericField::Text("inf".into())), None);
        assert_eq!(parse_quantity(&NumericField::Text("2.5".into())), None);
        assert_eq!(parse_quantity(&NumericField::Number(4.0)), Some(4));
        assert_eq!(parse_number(&NumericField::Other(serde_json::Value::Bool(true))), None);
        assert_eq!(parse_quantity(&NumericField::Other(serde_json::json!([]))), None);
    }

    #[test]
    fn filter_keeps_only_positive_quantity_and_price() {
        let rows = vec![ticket(0.0, 5.0), ticket(3.0, 0.0), ticket(3.0, 5.0)];
        let (kept, stats) = normalize_tickets(&rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].quantity, 3);
        assert_eq!(kept[0].price_min, 5.0);
        assert_eq!(stats.dropped_no_quantity, 1);
        assert_eq!(stats.dropped_no_price, 1);
        assert_eq!(stats.kept, 1);
    }

    #[test]
    fn unparseable_row_is_dropped_not_fatal() {
        let rows = vec![
            TicketPayload {
                categoria: Some("VIP".into()),
                precio_min: text("call us"),
                precio_max: text("2,000"),
                cantidad: text("4"),
            },
            TicketPayload {
                categoria: Some("Cat 2".into()),
                precio_min: text("1,100"),
                precio_max: text("2,000"),
                cantidad: text("4"),
            },
        ];
        let (kept, stats) = normalize_tickets(&rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].price_min, 1100.0);
        assert_eq!(stats.dropped_unparseable, 1);
    }

    #[test]
    fn min_above_max_is_not_rejected() {
        let rows = vec![TicketPayload {
            categoria: None,
            precio_min: num(50.0),
            precio_max: num(10.0),
            cantidad: num(1.0),
        }];
        let (kept, _) = normalize_tickets(&rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].category, "");
    }

    #[test]
    fn batch_requires_tickets() {
        let req = IngestRequest {
            event: Some(MatchPayload { title: Some("A vs B".into()), ..Default::default() }),
            tickets: Some(Vec::new()),
            resultados: None,
        };
        assert!(matches!(into_batch(req), Err(AppError::Validation(_))));

        let req = IngestRequest {
            event: Some(MatchPayload { title: Some("A vs B".into()), ..Default::default() }),
            tickets: None,
            resultados: None,
        };
        assert!(matches!(into_batch(req), Err(AppError::Validation(_))));
    }

    #[test]
    fn batch_requires_title() {
        let req = IngestRequest {
            event: Some(MatchPayload { title: Some("   ".into()), ..Default::default() }),
            tickets: Some(vec![ticket(1.0, 1.0)]),
            resultados: None,
        };
        assert!(matches!(into_batch(req), Err(AppError::Validation(_))));

        let req = IngestRequest { event: None, tickets: Some(vec![ticket(1.0, 1.0)]), resultados: None };
        assert!(matches!(into_batch(req), Err(AppError::Validation(_))));
    }

    #[test]
    fn documented_shape_maps_all_match_fields() {
        let req: IngestRequest = serde_json::from_value(serde_json::json!({
            "match": {
                "title": "Argentina vs Algeria",
                "stadium": "Kansas City Stadium",
                "fecha": "2026-06-16",
                "local": "Argentina",
                "visitante": "Algeria",
                "link": "https://example.test/m/1"
            },
            "tickets": [{ "categoria": "Category 1", "precioMin": "1,200", "precioMax": 1500, "cantidad": 2 }]
        }))
        .unwrap();
        let (m, tickets) = into_batch(req).unwrap();
        assert_eq!(m.title, "Argentina vs Algeria");
        assert_eq!(m.venue, "Kansas City Stadium");
        assert_eq!(m.home_team, "Argentina");
        assert_eq!(m.away_team, "Algeria");
        assert_eq!(m.source_link, "https://example.test/m/1");
        assert_eq!(tickets.len(), 1);
    }

    #[test]
    fn legacy_flat_shape_takes_metadata_from_first_row() {
        let req = IngestRequest {
            event: None,
            tickets: None,
            resultados: Some(vec![
                LegacyTicketPayload {
                    title: Some("Mexico vs South Africa".into()),
                    estadium: Some("Mexico City Stadium".into()),
                    fecha: Some("2026-06-11".into()),
                    ticket: ticket(2.0, 300.0),
                },
                LegacyTicketPayload {
                    title: Some("ignored".into()),
                    estadium: None,
                    fecha: None,
                    ticket: ticket(1.0, 150.0),
                },
            ]),
        };
        let (m, tickets) = into_batch(req).unwrap();
        assert_eq!(m.title, "Mexico vs South Africa");
        assert_eq!(m.venue, "Mexico City Stadium");
        assert_eq!(m.home_team, "");
        assert_eq!(tickets.len(), 2);
    }

    #[test]
    fn legacy_flat_shape_rejects_empty_list() {
        let req = IngestRequest { event: None, tickets: None, resultados: Some(Vec::new()) };
        assert!(matches!(into_batch(req), Err(AppError::Validation(_))));
    }
}

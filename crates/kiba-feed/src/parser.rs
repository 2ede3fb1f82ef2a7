//! Exchange frame parsing.
//!
//! Turns raw WebSocket text frames into [`Tick`]s. Control traffic
//! (acks, heartbeats, info events) is dropped with `Ok(None)`; frames that
//! look like data but cannot be read yield an error for the caller to count.

use crate::error::{FeedError, FeedResult};
use crate::tick::Tick;
use kiba_core::{Instrument, Source};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Per-connection frame parser.
pub trait FrameParser: Send {
    fn source(&self) -> Source;

    /// Parse one text frame.
    fn parse(&mut self, text: &str) -> FeedResult<Option<Tick>>;
}

/// Parser for the connection's source.
pub fn parser_for(source: Source, instrument: Instrument) -> Box<dyn FrameParser> {
    match source {
        Source::Binance => Box::new(BinanceParser::new(instrument)),
        Source::Bitfinex => Box::new(BitfinexParser::new(instrument)),
    }
}

/// Binance 24h mini ticker.
/// Format: {"e":"24hrMiniTicker","E":1672515782136,"s":"ETHBTC","c":"0.06851000",...}
#[derive(Debug, Deserialize)]
struct BinanceMiniTicker {
    #[serde(rename = "s", default)]
    symbol: Option<String>,
    #[serde(rename = "c", default)]
    close: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Binance `<symbol>@miniTicker` stream.
#[derive(Debug, Clone)]
pub struct BinanceParser {
    symbol: String,
}

impl BinanceParser {
    pub fn new(instrument: Instrument) -> Self {
        Self {
            symbol: instrument.symbol(),
        }
    }
}

impl FrameParser for BinanceParser {
    fn source(&self) -> Source {
        Source::Binance
    }

    fn parse(&mut self, text: &str) -> FeedResult<Option<Tick>> {
        let value: Value = serde_json::from_str(text)?;
        // Combined streams wrap the payload: {"stream": "...", "data": {...}}
        let payload = match value {
            Value::Object(mut obj) if obj.contains_key("data") => {
                obj.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };
        if !payload.is_object() {
            return Err(FeedError::UnexpectedFrame(text.to_string()));
        }

        let frame: BinanceMiniTicker = serde_json::from_value(payload)?;
        if let Some(error) = frame.error {
            warn!(source = "BINANCE", %error, "Error frame received");
            return Ok(None);
        }
        let Some(close) = frame.close else {
            // Subscription acks: {"result":null,"id":1}
            debug!(source = "BINANCE", %text, "Non-ticker frame ignored");
            return Ok(None);
        };
        if let Some(symbol) = frame.symbol {
            if !symbol.eq_ignore_ascii_case(&self.symbol) {
                return Err(FeedError::UnexpectedFrame(format!(
                    "symbol {symbol}, expected {}",
                    self.symbol
                )));
            }
        }

        let tick = Tick::from_raw(Some(&close), &self.symbol, Source::Binance.as_str())
            .ok_or_else(|| FeedError::ParseError(format!("close price {close}")))?;
        Ok(Some(tick))
    }
}

/// Bitfinex event frame.
/// Format: {"event":"subscribed","channel":"ticker","chanId":224555,"symbol":"tETHBTC"}
#[derive(Debug, Deserialize)]
struct BitfinexEvent {
    event: String,
    #[serde(rename = "chanId", default)]
    chan_id: Option<u64>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    code: Option<i64>,
}

/// Index of the price taken from a ticker array:
/// [BID, BID_SIZE, ASK, ASK_SIZE, DAILY_CHANGE, ...]
const BITFINEX_PRICE_INDEX: usize = 2;

/// Bitfinex v2 public ticker channel.
#[derive(Debug, Clone)]
pub struct BitfinexParser {
    pair: String,
    symbol: String,
    chan_id: Option<u64>,
}

impl BitfinexParser {
    pub fn new(instrument: Instrument) -> Self {
        let pair = instrument.symbol();
        Self {
            symbol: format!("t{pair}"),
            pair,
            chan_id: None,
        }
    }

    /// Channel bound by the last `subscribed` event.
    pub fn chan_id(&self) -> Option<u64> {
        self.chan_id
    }

    fn handle_event(&mut self, value: Value) -> FeedResult<Option<Tick>> {
        let event: BitfinexEvent = serde_json::from_value(value)?;
        match event.event.as_str() {
            "subscribed" => {
                let symbol_matches = event
                    .symbol
                    .as_deref()
                    .map_or(true, |s| s.eq_ignore_ascii_case(&self.symbol));
                if let (Some(chan_id), true) = (event.chan_id, symbol_matches) {
                    info!(source = "BITFINEX", chan_id, symbol = %self.symbol, "Ticker channel subscribed");
                    self.chan_id = Some(chan_id);
                }
            }
            "error" => {
                warn!(
                    source = "BITFINEX",
                    code = event.code.unwrap_or_default(),
                    msg = event.msg.as_deref().unwrap_or(""),
                    "Error event received"
                );
            }
            other => debug!(source = "BITFINEX", event = other, "Event ignored"),
        }
        Ok(None)
    }

    fn handle_channel(&self, items: &[Value]) -> FeedResult<Option<Tick>> {
        let chan_id = items.first().and_then(Value::as_u64);
        if chan_id.is_none() || chan_id != self.chan_id {
            debug!(source = "BITFINEX", ?chan_id, "Frame for unbound channel ignored");
            return Ok(None);
        }

        match items.get(1) {
            Some(Value::String(tag)) if tag == "hb" => Ok(None),
            Some(Value::Array(fields)) => {
                let raw = fields.get(BITFINEX_PRICE_INDEX).ok_or_else(|| {
                    FeedError::UnexpectedFrame(format!("ticker with {} fields", fields.len()))
                })?;
                let tick = Tick::from_raw(Some(raw), &self.pair, Source::Bitfinex.as_str())
                    .ok_or_else(|| FeedError::ParseError(format!("ticker price {raw}")))?;
                Ok(Some(tick))
            }
            _ => Err(FeedError::UnexpectedFrame(
                Value::Array(items.to_vec()).to_string(),
            )),
        }
    }
}

impl FrameParser for BitfinexParser {
    fn source(&self) -> Source {
        Source::Bitfinex
    }

    fn parse(&mut self, text: &str) -> FeedResult<Option<Tick>> {
        let value: Value = serde_json::from_str(text)?;
        match value {
            Value::Object(_) => self.handle_event(value),
            Value::Array(items) => self.handle_channel(&items),
            _ => Err(FeedError::UnexpectedFrame(text.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiba_core::{Price, Ticker};
    use rust_decimal_macros::dec;

    fn eth_btc() -> Instrument {
        Instrument::new(Ticker::Eth, Ticker::Btc).unwrap()
    }

    #[test]
    fn test_binance_mini_ticker() {
        let mut parser = BinanceParser::new(eth_btc());
        let frame = r#"{"e":"24hrMiniTicker","E":1672515782136,"s":"ETHBTC","c":"0.06851000","o":"0.06800000","h":"0.069","l":"0.067","v":"1000","q":"68.5"}"#;

        let tick = parser.parse(frame).unwrap().unwrap();
        assert_eq!(tick.source, Source::Binance);
        assert_eq!(tick.instrument, eth_btc());
        assert_eq!(tick.price, Price::new(dec!(0.06851)));
    }

    #[test]
    fn test_binance_combined_stream_envelope() {
        let mut parser = BinanceParser::new(eth_btc());
        let frame = r#"{"stream":"ethbtc@miniTicker","data":{"s":"ETHBTC","c":"0.07"}}"#;
        let tick = parser.parse(frame).unwrap().unwrap();
        assert_eq!(tick.price, Price::new(dec!(0.07)));
    }

    #[test]
    fn test_binance_control_frames_dropped() {
        let mut parser = BinanceParser::new(eth_btc());
        assert!(parser.parse(r#"{"result":null,"id":1}"#).unwrap().is_none());
        assert!(parser
            .parse(r#"{"error":{"code":2,"msg":"Invalid request"}}"#)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_binance_bad_frames_are_errors() {
        let mut parser = BinanceParser::new(eth_btc());

        let err = parser.parse("not json").unwrap_err();
        assert_eq!(err.reason(), "parse_error");

        let err = parser.parse(r#"{"s":"ETHBTC","c":"0"}"#).unwrap_err();
        assert_eq!(err.reason(), "parse_error");

        let err = parser.parse(r#"{"s":"LTCBTC","c":"0.003"}"#).unwrap_err();
        assert_eq!(err.reason(), "unexpected_frame");

        let err = parser.parse("[1,2]").unwrap_err();
        assert_eq!(err.reason(), "unexpected_frame");
    }

    #[test]
    fn test_bitfinex_subscription_flow() {
        let mut parser = BitfinexParser::new(eth_btc());

        assert!(parser
            .parse(r#"{"event":"info","version":2,"platform":{"status":1}}"#)
            .unwrap()
            .is_none());
        // Ticker before the channel is bound
        assert!(parser.parse("[17470,[0.068,10,0.069,12]]").unwrap().is_none());

        parser
            .parse(r#"{"event":"subscribed","channel":"ticker","chanId":17470,"symbol":"tETHBTC","pair":"ETHBTC"}"#)
            .unwrap();
        assert_eq!(parser.chan_id(), Some(17470));

        assert!(parser.parse(r#"[17470,"hb"]"#).unwrap().is_none());

        let frame = "[17470,[0.06849,52.1,0.06851,40.3,0.0004,0.0059,0.06851,1200.5,0.0692,0.0671]]";
        let tick = parser.parse(frame).unwrap().unwrap();
        assert_eq!(tick.source, Source::Bitfinex);
        assert_eq!(tick.price, Price::new(dec!(0.06851)));
    }

    #[test]
    fn test_bitfinex_ignores_other_channels_and_symbols() {
        let mut parser = BitfinexParser::new(eth_btc());
        parser
            .parse(r#"{"event":"subscribed","channel":"ticker","chanId":5,"symbol":"tLTCBTC"}"#)
            .unwrap();
        assert_eq!(parser.chan_id(), None);

        parser
            .parse(r#"{"event":"subscribed","channel":"ticker","chanId":6,"symbol":"tETHBTC"}"#)
            .unwrap();
        assert!(parser.parse("[5,[1,1,2,1]]").unwrap().is_none());
        assert!(parser
            .parse(r#"{"event":"error","msg":"symbol: invalid","code":10300}"#)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_bitfinex_malformed_ticker() {
        let mut parser = BitfinexParser::new(eth_btc());
        parser
            .parse(r#"{"event":"subscribed","channel":"ticker","chanId":9,"symbol":"tETHBTC"}"#)
            .unwrap();

        assert_eq!(parser.parse("[9,[0.1]]").unwrap_err().reason(), "unexpected_frame");
        assert_eq!(parser.parse("[9,[0.1,1,null,1]]").unwrap_err().reason(), "parse_error");
        assert_eq!(parser.parse("[9,42]").unwrap_err().reason(), "unexpected_frame");
    }

    #[test]
    fn test_four_letter_quote_pair() {
        let ltc_usdt = Instrument::new(Ticker::Ltc, Ticker::Usdt).unwrap();
        let mut parser = BitfinexParser::new(ltc_usdt);
        parser
            .parse(r#"{"event":"subscribed","channel":"ticker","chanId":3,"symbol":"tLTCUSDT"}"#)
            .unwrap();
        let tick = parser.parse("[3,[71.2,5,71.3,4]]").unwrap().unwrap();
        assert_eq!(tick.instrument, ltc_usdt);
        assert_eq!(tick.price, Price::new(dec!(71.3)));

        let mut parser = BinanceParser::new(ltc_usdt);
        let tick = parser.parse(r#"{"s":"LTCUSDT","c":"71.25"}"#).unwrap().unwrap();
        assert_eq!(tick.instrument, ltc_usdt);
    }

    #[test]
    fn test_parser_for_dispatch() {
        assert_eq!(parser_for(Source::Binance, eth_btc()).source(), Source::Binance);
        assert_eq!(parser_for(Source::Bitfinex, eth_btc()).source(), Source::Bitfinex);
    }
}

use std::collections::HashMap;

use common::{ContractId, GatewayEvent, Quote};

use crate::window::BarWindow;

/// All market state shared between the gateway feed and the strategy loop.
///
/// Mutated only by `apply` while the engine drains the single-consumer event
/// channel at the top of each cycle; the strategy reads it immutably. This
/// funneling is what keeps the feed thread and the evaluation loop from
/// racing.
#[derive(Debug)]
pub struct MarketState {
    window: BarWindow,
    contract_bars: HashMap<ContractId, BarWindow>,
    quotes: HashMap<ContractId, Quote>,
    index_price: f64,
    vol_index: f64,
    capacity: usize,
}

impl MarketState {
    pub fn new(window_capacity: usize) -> Self {
        Self {
            window: BarWindow::new(window_capacity),
            contract_bars: HashMap::new(),
            quotes: HashMap::new(),
            index_price: 0.0,
            vol_index: 0.0,
            capacity: window_capacity,
        }
    }

    /// Apply one gateway event. Order events are not handled here — the
    /// engine routes those to the strategy. Connection events carry no
    /// market data; the gateway itself is the liveness source.
    pub fn apply(&mut self, event: &GatewayEvent) {
        match event {
            GatewayEvent::Bar(bar) => self.window.append(*bar),
            GatewayEvent::ContractBar { contract, bar } => {
                let capacity = self.capacity;
                self.contract_bars
                    .entry(contract.clone())
                    .or_insert_with(|| BarWindow::new(capacity))
                    .append(*bar);
            }
            GatewayEvent::IndexPrice(price) => self.index_price = *price,
            GatewayEvent::VolIndex(level) => self.vol_index = *level,
            GatewayEvent::QuoteTick {
                contract,
                bid,
                ask,
                last,
                volume,
            } => {
                let quote = self.quotes.entry(contract.clone()).or_default();
                if let Some(v) = bid {
                    quote.bid = *v;
                }
                if let Some(v) = ask {
                    quote.ask = *v;
                }
                if let Some(v) = last {
                    quote.last = *v;
                }
                if let Some(v) = volume {
                    quote.volume = *v;
                }
            }
            GatewayEvent::Greeks {
                contract,
                delta,
                gamma,
                theta,
                vega,
                iv,
            } => {
                let quote = self.quotes.entry(contract.clone()).or_default();
                quote.delta = *delta;
                quote.gamma = *gamma;
                quote.theta = *theta;
                quote.vega = *vega;
                quote.iv = *iv;
            }
            GatewayEvent::Connection { .. } => {}
            GatewayEvent::Order(_) => {}
        }
    }

    pub fn bars(&self) -> &BarWindow {
        &self.window
    }

    /// Per-contract bar history, if any bars have arrived for the contract.
    pub fn contract_bars(&self, contract: &ContractId) -> Option<&BarWindow> {
        self.contract_bars.get(contract)
    }

    pub fn quotes(&self) -> &HashMap<ContractId, Quote> {
        &self.quotes
    }

    pub fn quote(&self, contract: &ContractId) -> Option<&Quote> {
        self.quotes.get(contract)
    }

    /// Last trade price of the underlying index; 0.0 until the first tick.
    pub fn index_price(&self) -> f64 {
        self.index_price
    }

    pub fn vol_index(&self) -> f64 {
        self.vol_index
    }
}

impl Default for MarketState {
    fn default() -> Self {
        Self::new(BarWindow::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{Bar, OptionRight};

    fn spx_call() -> ContractId {
        ContractId::new("SPX", 5900, OptionRight::Call, "20250613")
    }

    #[test]
    fn quote_ticks_merge_into_one_record() {
        let mut market = MarketState::new(10);
        market.apply(&GatewayEvent::QuoteTick {
            contract: spx_call(),
            bid: Some(1.20),
            ask: Some(1.40),
            last: None,
            volume: None,
        });
        market.apply(&GatewayEvent::QuoteTick {
            contract: spx_call(),
            bid: None,
            ask: None,
            last: Some(1.30),
            volume: Some(250.0),
        });
        market.apply(&GatewayEvent::Greeks {
            contract: spx_call(),
            delta: 0.44,
            gamma: 0.01,
            theta: -0.5,
            vega: 0.2,
            iv: 0.18,
        });

        let quote = market.quote(&spx_call()).unwrap();
        assert_eq!(quote.bid, 1.20);
        assert_eq!(quote.ask, 1.40);
        assert_eq!(quote.last, 1.30);
        assert_eq!(quote.delta, 0.44);
    }

    #[test]
    fn bars_and_index_ticks_update_state() {
        let mut market = MarketState::new(10);
        market.apply(&GatewayEvent::Bar(Bar {
            timestamp: Utc::now(),
            open: 5900.0,
            high: 5905.0,
            low: 5895.0,
            close: 5902.0,
        }));
        market.apply(&GatewayEvent::IndexPrice(5903.5));
        market.apply(&GatewayEvent::VolIndex(17.2));

        assert_eq!(market.bars().len(), 1);
        assert_eq!(market.index_price(), 5903.5);
        assert_eq!(market.vol_index(), 17.2);
    }

    #[test]
    fn contract_bars_accumulate_per_contract() {
        let mut market = MarketState::new(10);
        assert!(market.contract_bars(&spx_call()).is_none());

        market.apply(&GatewayEvent::ContractBar {
            contract: spx_call(),
            bar: Bar {
                timestamp: Utc::now(),
                open: 2.00,
                high: 2.10,
                low: 1.95,
                close: 2.05,
            },
        });

        let bars = market.contract_bars(&spx_call()).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars.last().unwrap().close, 2.05);
    }
}

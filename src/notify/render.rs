// src/notify/render.rs
use std::time::Duration;

use html_escape::encode_text;

use super::{LinkButton, Message};
use crate::diff::{TransitionEvent, TransitionKind};
use crate::model::Tier;

pub const ALERT_TEXT: &str = "⚠️ 警告：库存监控请求失败，请检查网络或服务器！";
pub const LISTED_BUTTON_TEXT: &str = "快速进入通道";
pub const UNKNOWN_REGION: &str = "未知地区";
pub const UNKNOWN_STOCK: &str = "未知";

/// Formats transition events for the chat surface (Telegram HTML).
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    pub stock_changed_expiry: Duration,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            stock_changed_expiry: Duration::from_secs(60),
        }
    }
}

impl Renderer {
    pub fn new(stock_changed_expiry: Duration) -> Self {
        Self { stock_changed_expiry }
    }

    pub fn render(&self, ev: &TransitionEvent) -> Message {
        let r = &ev.record;
        let region = if r.region_id.is_empty() {
            UNKNOWN_REGION
        } else {
            r.region_id.as_str()
        };
        let region = encode_text(region);
        let name = encode_text(&r.name);
        let stock = stock_text(r.stock_count);
        let tier = tier_line(r.tier);

        match ev.kind {
            TransitionKind::Listed => {
                let mut text = format!(
                    "🟢 <b>上架 - {region}</b>\n\n名称: <b>{name}</b>\n库存: <b>{stock}</b>\n{tier}"
                );
                if !r.description_text.is_empty() {
                    text.push_str(&format!(
                        "配置:\n<pre>{}</pre>\n",
                        encode_text(&r.description_text)
                    ));
                }
                let mut msg = Message::html(text);
                if !r.detail_url.is_empty() {
                    msg.button = Some(LinkButton {
                        text: LISTED_BUTTON_TEXT.to_string(),
                        url: r.detail_url.clone(),
                    });
                }
                msg
            }
            TransitionKind::StockChanged => {
                let mut msg = Message::html(format!(
                    "🟡 <b>库存变化 - {region}</b>\n名称: <b>{name}</b>\n库存: <b>{stock}</b>\n{tier}\n"
                ));
                msg.expire_after = Some(self.stock_changed_expiry);
                msg
            }
            TransitionKind::SoldOut => Message::html(format!(
                "🔴 <b>售罄 - {region}</b>\n名称: <b>{name}</b>\n库存: <b>{stock}</b>\n{tier}\n"
            )),
        }
    }
}

pub fn operator_alert() -> Message {
    Message::plain(ALERT_TEXT)
}

pub fn stock_text(stock: Option<u32>) -> String {
    stock.map_or_else(|| UNKNOWN_STOCK.to_string(), |n| n.to_string())
}

fn tier_line(tier: Tier) -> String {
    match tier.label() {
        Some(label) => format!("要求：<b>{label}</b>\n"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ListingRecord;
    use crate::notify::ParseMode;

    fn event(kind: TransitionKind, stock: u32) -> TransitionEvent {
        let mut record = ListingRecord::new("黄金区", "HK <Mini>", Some(stock)).with_tier(Tier::level(3));
        record.description_text = "1 vCPU\n1 GB".into();
        record.detail_url = "https://shop.example/cart?gid=2".into();
        TransitionEvent {
            kind,
            record,
            previous_stock: 0,
        }
    }

    #[test]
    fn listed_has_detail_block_and_button() {
        let m = Renderer::default().render(&event(TransitionKind::Listed, 5));
        assert_eq!(
            m.text,
            "🟢 <b>上架 - 黄金区</b>\n\n名称: <b>HK &lt;Mini&gt;</b>\n库存: <b>5</b>\n要求：<b>黄金会员</b>\n配置:\n<pre>1 vCPU\n1 GB</pre>\n"
        );
        assert_eq!(m.parse_mode, Some(ParseMode::Html));
        assert_eq!(m.button.as_ref().unwrap().text, LISTED_BUTTON_TEXT);
        assert_eq!(m.expire_after, None);
    }

    #[test]
    fn stock_changed_expires() {
        let m = Renderer::new(Duration::from_secs(60)).render(&event(TransitionKind::StockChanged, 2));
        assert_eq!(
            m.text,
            "🟡 <b>库存变化 - 黄金区</b>\n名称: <b>HK &lt;Mini&gt;</b>\n库存: <b>2</b>\n要求：<b>黄金会员</b>\n\n"
        );
        assert_eq!(m.expire_after, Some(Duration::from_secs(60)));
        assert!(m.button.is_none());
    }

    #[test]
    fn sold_out_without_tier_line() {
        let mut ev = event(TransitionKind::SoldOut, 0);
        ev.record.tier = Tier::NONE;
        let m = Renderer::default().render(&ev);
        assert_eq!(
            m.text,
            "🔴 <b>售罄 - 黄金区</b>\n名称: <b>HK &lt;Mini&gt;</b>\n库存: <b>0</b>\n\n"
        );
        assert_eq!(m.expire_after, None);
        assert!(m.button.is_none());
    }

    #[test]
    fn alert_is_plain_text() {
        let m = operator_alert();
        assert_eq!(m.text, ALERT_TEXT);
        assert_eq!(m.parse_mode, None);
    }
}

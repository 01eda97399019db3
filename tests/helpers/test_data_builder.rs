// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================
#![allow(dead_code)]

use sales_batch_guard::domain::document::{DocumentItem, SalesDocument, WorkOrder};
use sales_batch_guard::domain::types::DocumentKind;

// ==========================================
// SalesDocument 构建器
// ==========================================

pub struct DocumentBuilder {
    kind: DocumentKind,
    name: String,
    update_stock: bool,
    allow_batch_exceed: bool,
    items: Vec<DocumentItem>,
}

impl DocumentBuilder {
    pub fn invoice(name: &str) -> Self {
        Self {
            kind: DocumentKind::SalesInvoice,
            name: name.to_string(),
            update_stock: false,
            allow_batch_exceed: false,
            items: Vec::new(),
        }
    }

    pub fn delivery_note(name: &str) -> Self {
        Self {
            kind: DocumentKind::DeliveryNote,
            ..Self::invoice(name)
        }
    }

    pub fn update_stock(mut self, flag: bool) -> Self {
        self.update_stock = flag;
        self
    }

    pub fn allow_batch_exceed(mut self, flag: bool) -> Self {
        self.allow_batch_exceed = flag;
        self
    }

    /// 追加一行（行号自动递增）
    pub fn item(mut self, batch_no: Option<&str>, qty: f64) -> Self {
        let idx = self.items.len() + 1;
        self.items.push(DocumentItem {
            idx,
            item_code: format!("ITEM-{}", idx),
            batch_no: batch_no.map(str::to_string),
            qty,
            batch_size_limit: None,
            stock_qty: None,
            conversion_factor: None,
        });
        self
    }

    /// 追加一行，带显式批次上限
    pub fn item_with_limit(mut self, batch_no: &str, qty: f64, limit: f64) -> Self {
        self = self.item(Some(batch_no), qty);
        if let Some(last) = self.items.last_mut() {
            last.batch_size_limit = Some(limit);
        }
        self
    }

    /// 追加一行，带换算系数
    pub fn item_with_factor(mut self, batch_no: &str, qty: f64, conversion_factor: f64) -> Self {
        self = self.item(Some(batch_no), qty);
        if let Some(last) = self.items.last_mut() {
            last.conversion_factor = Some(conversion_factor);
        }
        self
    }

    pub fn build(self) -> SalesDocument {
        SalesDocument {
            kind: self.kind,
            name: self.name,
            update_stock: self.update_stock,
            allow_batch_exceed: self.allow_batch_exceed,
            items: self.items,
        }
    }
}

// ==========================================
// WorkOrder 构建器
// ==========================================

pub fn work_order(name: &str, batch: Option<&str>, qty: f64) -> WorkOrder {
    WorkOrder {
        name: name.to_string(),
        production_item: "FG-001".to_string(),
        qty,
        production_qty: None,
        production_batch: batch.map(str::to_string),
        batch_no: None,
        batch: None,
        allow_batch_exceed: false,
    }
}

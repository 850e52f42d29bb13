// src/services/inventory_service.rs
//
// Reconciliação do inventário: casa os itens da fatura já confirmada com
// os registros existentes (por código), faz um upsert de metadados em lote
// e aplica os incrementos de estoque item a item, com rastreio de falhas
// parciais. A fatura em si já está gravada quando chegamos aqui; nada do
// que falhar nesta fase desfaz aquelas escritas.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        inventory::{InventoryRecord, InventoryUpsertRow, ReconcileAction, ReconcileResult},
        wizard::LineItem,
    },
};

// Tamanho conservador de chunk para as buscas por código, para não
// estourar o limite de tamanho de requisição do backend.
pub const CODE_CHUNK_SIZE: usize = 15;

// Porta de persistência do inventário. O repositório sqlx implementa;
// os testes usam um gateway em memória.
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    async fn list_all(&self) -> Result<Vec<InventoryRecord>, AppError>;
    async fn fetch_by_codes(&self, codes: &[String]) -> Result<Vec<InventoryRecord>, AppError>;
    async fn upsert_rows(&self, rows: &[InventoryUpsertRow])
    -> Result<Vec<InventoryRecord>, AppError>;
    async fn set_stock(&self, id: Uuid, stock: Decimal) -> Result<(), AppError>;
}

/// Saída da reconciliação: um resultado por item, mais a lista de códigos
/// novos sem quantidade resolvível (quando não vazia, nada foi aplicado).
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub results: Vec<ReconcileResult>,
    pub missing_stock: Vec<String>,
}

#[derive(Clone)]
pub struct InventoryService {
    gateway: Arc<dyn InventoryGateway>,
}

impl InventoryService {
    pub fn new(gateway: Arc<dyn InventoryGateway>) -> Self {
        Self { gateway }
    }

    // Snapshot completo para a sessão do assistente.
    pub async fn snapshot(&self) -> Result<Vec<InventoryRecord>, AppError> {
        self.gateway.list_all().await
    }

    // Busca em chunks e devolve um mapa código -> registro.
    async fn fetch_chunked(
        &self,
        codes: &[String],
    ) -> Result<HashMap<String, InventoryRecord>, AppError> {
        let mut map = HashMap::new();
        for chunk in codes.chunks(CODE_CHUNK_SIZE) {
            for record in self.gateway.fetch_by_codes(chunk).await? {
                map.insert(record.code.clone(), record);
            }
        }
        Ok(map)
    }

    /// Reconcilia os itens finalizados da fatura contra o inventário.
    ///
    /// Fases: (1) lookup por código — falhas degradam para "nenhum registro
    /// encontrado"; (2) upsert de metadados em lote — itens novos precisam
    /// de quantidade inicial, senão a reconciliação inteira aborta antes de
    /// escrever qualquer coisa; (3) incrementos de estoque por item, em
    /// paralelo, com falha independente por item; (4) confirmação dos
    /// inserts.
    pub async fn reconcile_line_items(
        &self,
        items: &[LineItem],
        supplier_id: Option<Uuid>,
    ) -> ReconcileOutcome {
        let mut results: Vec<ReconcileResult> = Vec::new();
        let mut missing_stock: Vec<String> = Vec::new();

        if items.is_empty() {
            return ReconcileOutcome { results, missing_stock };
        }

        // Códigos distintos, na ordem de chegada.
        let mut seen = HashSet::new();
        let mut codes = Vec::new();
        for item in items {
            let code = item.code.trim();
            if !code.is_empty() && seen.insert(code.to_string()) {
                codes.push(code.to_string());
            }
        }

        // --- FASE 1: LOOKUP ---
        // Falha aberta: sem lookup, todos os itens contam como novos (pode
        // duplicar inserts, mas o caminho feliz continua disponível).
        let mut existing = match self.fetch_chunked(&codes).await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(
                    "Lookup de inventário falhou; tratando todos os itens como novos: {}",
                    e
                );
                HashMap::new()
            }
        };

        // --- FASE 2: MONTAGEM DO UPSERT ---
        let mut upsert_rows: Vec<InventoryUpsertRow> = Vec::new();
        let mut increments: Vec<(String, Decimal)> = Vec::new();

        for item in items {
            let code = item.code.trim().to_string();
            if code.is_empty() {
                let mut result = ReconcileResult::new(code, ReconcileAction::Failed);
                result.detail = Some("item sem código".to_string());
                results.push(result);
                continue;
            }

            let quantity = item.quantity;
            let zone = item.zone.as_deref().and_then(zone_digits);

            match existing.get(&code) {
                Some(prior) => {
                    // Valores anteriores servem de fallback: uma linha
                    // existente nunca perde campos por receber vazio.
                    upsert_rows.push(InventoryUpsertRow {
                        code: code.clone(),
                        product_name: if item.name.trim().is_empty() {
                            prior.product_name.clone()
                        } else {
                            item.name.clone()
                        },
                        supplier_price: if item.supplier_price > Decimal::ZERO {
                            item.supplier_price
                        } else {
                            prior.supplier_price
                        },
                        sale_price: if item.sale_price > Decimal::ZERO {
                            item.sale_price
                        } else {
                            prior.sale_price
                        },
                        zone: zone.or(prior.zone),
                        // preservado: o upsert não altera estoque de linha existente
                        stock: prior.stock,
                        min_stock: prior.min_stock,
                        unit_type: prior.unit_type.clone(),
                        supplier_id: prior.supplier_id.or(supplier_id),
                    });
                    increments.push((code.clone(), quantity));

                    let mut result = ReconcileResult::new(code, ReconcileAction::ToUpdate);
                    result.previous_stock = Some(prior.stock);
                    result.quantity = Some(quantity);
                    result.product_name = Some(prior.product_name.clone());
                    results.push(result);
                }
                None => {
                    if quantity <= Decimal::ZERO {
                        missing_stock.push(code.clone());
                        let mut result = ReconcileResult::new(code, ReconcileAction::Failed);
                        result.detail = Some("quantidade inicial ausente".to_string());
                        results.push(result);
                        continue;
                    }

                    upsert_rows.push(InventoryUpsertRow {
                        code: code.clone(),
                        product_name: if item.name.trim().is_empty() {
                            code.clone()
                        } else {
                            item.name.clone()
                        },
                        supplier_price: item.supplier_price,
                        sale_price: if item.sale_price > Decimal::ZERO {
                            item.sale_price
                        } else {
                            item.supplier_price
                        },
                        zone,
                        stock: quantity,
                        min_stock: item.min_stock.unwrap_or(Decimal::ONE),
                        unit_type: item
                            .unit_type
                            .clone()
                            .unwrap_or_else(|| "UNIDADES".to_string()),
                        supplier_id,
                    });

                    let mut result = ReconcileResult::new(code, ReconcileAction::ToInsert);
                    result.quantity = Some(quantity);
                    result.product_name = Some(item.name.clone());
                    results.push(result);
                }
            }
        }

        // Falha fechada: item novo sem quantidade aborta a reconciliação
        // inteira antes de qualquer escrita.
        if !missing_stock.is_empty() {
            return ReconcileOutcome { results, missing_stock };
        }

        // Upsert em lote; falha aqui não interrompe (os incrementos ainda
        // podem funcionar para linhas que já existiam).
        if !upsert_rows.is_empty() {
            match self.gateway.upsert_rows(&upsert_rows).await {
                Ok(returned) => {
                    for record in returned {
                        existing.insert(record.code.clone(), record);
                    }
                }
                Err(e) => tracing::warn!("Upsert de inventário falhou: {}", e),
            }
        }

        // --- FASE 3: INCREMENTOS DE ESTOQUE ---
        // Relê o estoque atual (o lookup da fase 1 pode estar defasado) e
        // aplica os incrementos em paralelo, um item por vez.
        if !increments.is_empty() {
            let codes_to_update: Vec<String> =
                increments.iter().map(|(code, _)| code.clone()).collect();

            match self.fetch_chunked(&codes_to_update).await {
                Ok(latest) => {
                    let mut tasks: JoinSet<(String, Result<(Decimal, Decimal), String>)> =
                        JoinSet::new();

                    for (code, quantity) in increments {
                        let gateway = Arc::clone(&self.gateway);
                        let row = latest.get(&code).cloned();
                        tasks.spawn(async move {
                            let Some(row) = row else {
                                return (code, Err("registro não encontrado após upsert".to_string()));
                            };
                            let previous = row.stock;
                            let new_stock = previous + quantity;
                            match gateway.set_stock(row.id, new_stock).await {
                                Ok(()) => (code, Ok((previous, new_stock))),
                                Err(e) => (code, Err(e.to_string())),
                            }
                        });
                    }

                    while let Some(joined) = tasks.join_next().await {
                        match joined {
                            Ok((code, Ok((previous, new_stock)))) => {
                                if let Some(result) =
                                    results.iter_mut().find(|r| r.code == code)
                                {
                                    result.action = ReconcileAction::Updated;
                                    result.previous_stock = Some(previous);
                                    result.new_stock = Some(new_stock);
                                }
                            }
                            Ok((code, Err(detail))) => {
                                if let Some(result) =
                                    results.iter_mut().find(|r| r.code == code)
                                {
                                    result.action = ReconcileAction::UpdateFailed;
                                    result.detail = Some(detail);
                                }
                            }
                            Err(join_err) => {
                                tracing::error!("Task de incremento abortou: {}", join_err);
                            }
                        }
                    }
                }
                Err(e) => {
                    let detail = e.to_string();
                    tracing::warn!("Releitura de estoque falhou: {}", detail);
                    for result in results
                        .iter_mut()
                        .filter(|r| r.action == ReconcileAction::ToUpdate)
                    {
                        result.action = ReconcileAction::UpdateFailed;
                        result.detail = Some(detail.clone());
                    }
                }
            }
        }

        // --- FASE 4: CONFIRMAÇÃO DOS INSERTS ---
        for result in results.iter_mut() {
            if result.action == ReconcileAction::ToInsert {
                if let Some(record) = existing.get(&result.code) {
                    result.action = ReconcileAction::Inserted;
                    result.product_name = Some(record.product_name.clone());
                }
            }
        }

        ReconcileOutcome { results, missing_stock }
    }
}

// "ZONA 5" / "5" -> 5
fn zone_digits(raw: &str) -> Option<i32> {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn record(code: &str, name: &str, stock: &str) -> InventoryRecord {
        InventoryRecord {
            id: Uuid::new_v4(),
            code: code.to_string(),
            product_name: name.to_string(),
            supplier_price: dec("10.00"),
            sale_price: dec("16.20"),
            zone: Some(2),
            stock: dec(stock),
            min_stock: Decimal::ONE,
            unit_type: "UNIDADES".to_string(),
            supplier_id: None,
            updated_at: Utc::now(),
        }
    }

    fn line_item(code: &str, name: &str, quantity: &str) -> LineItem {
        LineItem {
            product_id: None,
            code: code.to_string(),
            name: name.to_string(),
            quantity: dec(quantity),
            supplier_price: dec("10.00"),
            sale_price: dec("16.20"),
            margin_percent: Some(dec("38")),
            zone: Some("5".to_string()),
            is_new_product: false,
            min_stock: None,
            unit_type: None,
            subtotal: dec(quantity) * dec("10.00"),
        }
    }

    // Gateway em memória com injeção de falhas.
    #[derive(Default)]
    struct MockGateway {
        rows: Mutex<HashMap<String, InventoryRecord>>,
        fail_lookup: AtomicBool,
        fail_stock_codes: Mutex<HashSet<String>>,
        lookup_chunks: Mutex<Vec<usize>>,
        upsert_calls: Mutex<usize>,
    }

    impl MockGateway {
        fn with_rows(records: Vec<InventoryRecord>) -> Self {
            let gateway = Self::default();
            {
                let mut rows = gateway.rows.lock().unwrap();
                for record in records {
                    rows.insert(record.code.clone(), record);
                }
            }
            gateway
        }

        fn stock_of(&self, code: &str) -> Option<Decimal> {
            self.rows.lock().unwrap().get(code).map(|r| r.stock)
        }
    }

    #[async_trait]
    impl InventoryGateway for MockGateway {
        async fn list_all(&self) -> Result<Vec<InventoryRecord>, AppError> {
            Ok(self.rows.lock().unwrap().values().cloned().collect())
        }

        async fn fetch_by_codes(
            &self,
            codes: &[String],
        ) -> Result<Vec<InventoryRecord>, AppError> {
            if self.fail_lookup.load(Ordering::SeqCst) {
                return Err(AppError::InternalServerError(anyhow::anyhow!(
                    "lookup indisponível"
                )));
            }
            self.lookup_chunks.lock().unwrap().push(codes.len());
            let rows = self.rows.lock().unwrap();
            Ok(codes.iter().filter_map(|c| rows.get(c).cloned()).collect())
        }

        async fn upsert_rows(
            &self,
            upserts: &[InventoryUpsertRow],
        ) -> Result<Vec<InventoryRecord>, AppError> {
            *self.upsert_calls.lock().unwrap() += 1;
            let mut rows = self.rows.lock().unwrap();
            let mut returned = Vec::new();
            for upsert in upserts {
                let record = rows
                    .entry(upsert.code.clone())
                    .and_modify(|existing| {
                        // como no ON CONFLICT: metadados sim, estoque não
                        existing.product_name = upsert.product_name.clone();
                        existing.supplier_price = upsert.supplier_price;
                        existing.sale_price = upsert.sale_price;
                        existing.zone = upsert.zone;
                        existing.min_stock = upsert.min_stock;
                        existing.unit_type = upsert.unit_type.clone();
                        existing.supplier_id = upsert.supplier_id;
                    })
                    .or_insert_with(|| InventoryRecord {
                        id: Uuid::new_v4(),
                        code: upsert.code.clone(),
                        product_name: upsert.product_name.clone(),
                        supplier_price: upsert.supplier_price,
                        sale_price: upsert.sale_price,
                        zone: upsert.zone,
                        stock: upsert.stock,
                        min_stock: upsert.min_stock,
                        unit_type: upsert.unit_type.clone(),
                        supplier_id: upsert.supplier_id,
                        updated_at: Utc::now(),
                    });
                returned.push(record.clone());
            }
            Ok(returned)
        }

        async fn set_stock(&self, id: Uuid, stock: Decimal) -> Result<(), AppError> {
            let mut rows = self.rows.lock().unwrap();
            let record = rows
                .values_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| AppError::InternalServerError(anyhow::anyhow!("id desconhecido")))?;
            if self
                .fail_stock_codes
                .lock()
                .unwrap()
                .contains(&record.code)
            {
                return Err(AppError::InternalServerError(anyhow::anyhow!(
                    "falha injetada"
                )));
            }
            record.stock = stock;
            Ok(())
        }
    }

    fn find<'a>(results: &'a [ReconcileResult], code: &str) -> &'a ReconcileResult {
        results.iter().find(|r| r.code == code).expect("código ausente")
    }

    #[tokio::test]
    async fn updates_existing_and_inserts_new_items() {
        // Cenário de referência: A existente (estoque 5, +3) e B novo (qtd 2).
        let gateway = Arc::new(MockGateway::with_rows(vec![record("A", "TALADRO", "5")]));
        let service = InventoryService::new(gateway.clone());

        let items = vec![line_item("A", "TALADRO", "3"), line_item("B", "BROCA", "2")];
        let outcome = service.reconcile_line_items(&items, None).await;

        assert!(outcome.missing_stock.is_empty());

        let a = find(&outcome.results, "A");
        assert_eq!(a.action, ReconcileAction::Updated);
        assert_eq!(a.previous_stock, Some(dec("5")));
        assert_eq!(a.new_stock, Some(dec("8")));

        let b = find(&outcome.results, "B");
        assert_eq!(b.action, ReconcileAction::Inserted);
        assert_eq!(b.quantity, Some(dec("2")));

        assert_eq!(gateway.stock_of("A"), Some(dec("8")));
        assert_eq!(gateway.stock_of("B"), Some(dec("2")));
    }

    #[tokio::test]
    async fn lookups_are_chunked() {
        let records: Vec<InventoryRecord> =
            (0..40).map(|i| record(&format!("C{}", i), "ITEM", "1")).collect();
        let items: Vec<LineItem> =
            (0..40).map(|i| line_item(&format!("C{}", i), "ITEM", "1")).collect();

        let gateway = Arc::new(MockGateway::with_rows(records));
        let service = InventoryService::new(gateway.clone());
        service.reconcile_line_items(&items, None).await;

        let chunks = gateway.lookup_chunks.lock().unwrap().clone();
        // duas passagens (lookup + releitura), nenhuma acima do limite
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|len| *len <= CODE_CHUNK_SIZE));
        assert_eq!(chunks[0], CODE_CHUNK_SIZE);
    }

    #[tokio::test]
    async fn lookup_failure_degrades_to_inserting_everything() {
        // Falha aberta: com o lookup fora do ar, até itens existentes são
        // tratados como novos (o upsert preserva o estoque da linha).
        let gateway = Arc::new(MockGateway::with_rows(vec![record("A", "TALADRO", "5")]));
        gateway.fail_lookup.store(true, Ordering::SeqCst);
        let service = InventoryService::new(gateway.clone());

        let outcome = service
            .reconcile_line_items(&[line_item("A", "TALADRO", "3")], None)
            .await;

        assert!(outcome.missing_stock.is_empty());
        assert_eq!(find(&outcome.results, "A").action, ReconcileAction::Inserted);
        // sem incremento: o estoque anterior permanece
        assert_eq!(gateway.stock_of("A"), Some(dec("5")));
    }

    #[tokio::test]
    async fn missing_quantity_on_new_item_aborts_everything() {
        let gateway = Arc::new(MockGateway::with_rows(vec![record("A", "TALADRO", "5")]));
        let service = InventoryService::new(gateway.clone());

        let items = vec![line_item("A", "TALADRO", "3"), line_item("NEW", "SIERRA", "0")];
        let outcome = service.reconcile_line_items(&items, None).await;

        assert_eq!(outcome.missing_stock, vec!["NEW".to_string()]);
        assert_eq!(find(&outcome.results, "NEW").action, ReconcileAction::Failed);
        // o item existente ficou provisório: nada foi escrito
        assert_eq!(find(&outcome.results, "A").action, ReconcileAction::ToUpdate);
        assert_eq!(*gateway.upsert_calls.lock().unwrap(), 0);
        assert_eq!(gateway.stock_of("A"), Some(dec("5")));
    }

    #[tokio::test]
    async fn stock_increment_failures_are_isolated_per_item() {
        let gateway = Arc::new(MockGateway::with_rows(vec![
            record("A", "TALADRO", "5"),
            record("B", "BROCA", "7"),
        ]));
        gateway
            .fail_stock_codes
            .lock()
            .unwrap()
            .insert("A".to_string());
        let service = InventoryService::new(gateway.clone());

        let items = vec![line_item("A", "TALADRO", "3"), line_item("B", "BROCA", "2")];
        let outcome = service.reconcile_line_items(&items, None).await;

        assert_eq!(find(&outcome.results, "A").action, ReconcileAction::UpdateFailed);
        let b = find(&outcome.results, "B");
        assert_eq!(b.action, ReconcileAction::Updated);
        assert_eq!(b.new_stock, Some(dec("9")));
        assert_eq!(gateway.stock_of("A"), Some(dec("5")));
        assert_eq!(gateway.stock_of("B"), Some(dec("9")));
    }

    #[tokio::test]
    async fn existing_fields_are_not_blanked_by_empty_input() {
        let mut prior = record("A", "TALADRO PERCUTOR", "5");
        prior.zone = Some(7);
        let gateway = Arc::new(MockGateway::with_rows(vec![prior]));
        let service = InventoryService::new(gateway.clone());

        let mut item = line_item("A", "", "1");
        item.supplier_price = Decimal::ZERO;
        item.sale_price = Decimal::ZERO;
        item.zone = None;

        service.reconcile_line_items(&[item], None).await;

        let rows = gateway.rows.lock().unwrap();
        let row = rows.get("A").unwrap();
        assert_eq!(row.product_name, "TALADRO PERCUTOR");
        assert_eq!(row.supplier_price, dec("10.00"));
        assert_eq!(row.zone, Some(7));
    }
}

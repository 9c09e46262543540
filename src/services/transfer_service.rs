// src/services/transfer_service.rs

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use calamine::{Data, Range, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{is_valid_phone, normalize_phone},
        error::AppError,
        i18n::I18nStore,
    },
    db::StoreDirectory,
    middleware::tenancy::ShopScope,
    models::{
        custom_field::{CustomField, CustomValueInput},
        customer::{Customer, CustomerRole},
    },
    services::{
        custom_field_service::{parse_flag, CustomFieldService},
        customer_service::{CustomerInput, CustomerService},
    },
};

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

// ---
// LAYOUT DA PLANILHA
// ---
// As 10 colunas fixas, na ordem da exportação
pub const FIXED_HEADERS: [&str; 10] = [
    "ID",
    "ชื่อ",
    "เบอร์โทรศัพท์",
    "Role",
    "OTP Verify",
    "Line Token",
    "รหัสร้านค้า",
    "รหัสสาขา",
    "คะแนนสะสม",
    "เช็คอินล่าสุด",
];

const ID_HEADERS: &[&str] = &["ID"];
const NAME_HEADERS: &[&str] = &["ชื่อ", "Name"];
const PHONE_HEADERS: &[&str] = &["เบอร์โทรศัพท์", "Phone"];
const ROLE_HEADERS: &[&str] = &["Role"];
const OTP_HEADERS: &[&str] = &["OTP Verify"];
const LINE_TOKEN_HEADERS: &[&str] = &["Line Token"];
const SHOP_HEADERS: &[&str] = &["รหัสร้านค้า", "Shop ID"];
const BRANCH_HEADERS: &[&str] = &["รหัสสาขา", "Branch ID"];

const SHEET_NAME: &str = "Customers";

// ---
// RELATÓRIO DA IMPORTAÇÃO
// ---

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImportRowError {
    // Número da linha na planilha (1 = cabeçalho)
    pub row: usize,
    pub code: String,
    pub value: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ImportReport {
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<ImportRowError>,
}

impl ImportReport {
    fn push_error(&mut self, row: usize, failure: RowFailure) {
        self.error_count += 1;
        self.errors.push(ImportRowError {
            row,
            code: failure.code.to_string(),
            value: failure.value,
            message: String::new(),
        });
    }

    /// Preenche `message` no idioma do cliente.
    pub fn localize(&mut self, lang: &str, i18n: &I18nStore) {
        for error in &mut self.errors {
            let value = match (error.code.as_str(), error.value.as_deref()) {
                // Para falhas genéricas o valor é o código do AppError
                ("failed", Some(code)) => i18n.translate(lang, code, &[]),
                (_, value) => value.unwrap_or_default().to_string(),
            };
            error.message = i18n.translate(
                lang,
                &format!("import.{}", error.code),
                &[("row", error.row.to_string()), ("value", value)],
            );
        }
    }
}

#[derive(Debug)]
struct RowFailure {
    code: &'static str,
    value: Option<String>,
}

impl RowFailure {
    fn new(code: &'static str, value: impl Into<String>) -> Self {
        Self { code, value: Some(value.into()) }
    }

    fn bare(code: &'static str) -> Self {
        Self { code, value: None }
    }

    /// Erros do serviço de clientes viram códigos de linha.
    fn from_app_error(err: AppError, id_raw: &str, branch_raw: &str) -> Self {
        match err {
            AppError::DuplicatePhone(phone) => Self::new("duplicate_phone", phone),
            AppError::CustomerNotFound => Self::new("customer_not_found", id_raw),
            AppError::BranchNotFound => Self::new("branch_not_found", branch_raw),
            other => {
                tracing::warn!("Linha de importação falhou: {}", other);
                Self::new("failed", other.code())
            }
        }
    }
}

/// Posição de cada coluna conhecida no cabeçalho.
struct ColumnMap {
    id: Option<usize>,
    name: usize,
    phone: usize,
    role: Option<usize>,
    otp_verify: Option<usize>,
    line_token: Option<usize>,
    shop_id: Option<usize>,
    branch_id: Option<usize>,
    names: Vec<String>,
}

impl ColumnMap {
    fn from_header(header: &[Data]) -> Result<Self, AppError> {
        let names: Vec<String> = header.iter().map(|cell| cell_text(cell).trim().to_string()).collect();
        let find = |aliases: &[&str]| names.iter().position(|n| aliases.contains(&n.as_str()));

        let name = find(NAME_HEADERS)
            .ok_or_else(|| AppError::InvalidWorkbook(format!("coluna '{}' ausente", NAME_HEADERS[0])))?;
        let phone = find(PHONE_HEADERS)
            .ok_or_else(|| AppError::InvalidWorkbook(format!("coluna '{}' ausente", PHONE_HEADERS[0])))?;

        Ok(Self {
            id: find(ID_HEADERS),
            name,
            phone,
            role: find(ROLE_HEADERS),
            otp_verify: find(OTP_HEADERS),
            line_token: find(LINE_TOKEN_HEADERS),
            shop_id: find(SHOP_HEADERS),
            branch_id: find(BRANCH_HEADERS),
            names,
        })
    }

    /// Colunas personalizadas: cabeçalho == nome do campo da loja.
    fn custom_columns(&self, fields: &[CustomField]) -> Vec<(usize, Uuid)> {
        fields
            .iter()
            .filter_map(|field| self.names.iter().position(|n| *n == field.name).map(|i| (i, field.id)))
            .collect()
    }
}

/// Texto de uma célula; números inteiros perdem o ".0".
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR({:?})", e),
        Data::DateTime(dt) => format!("{}", dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Primeira aba da planilha recebida.
fn read_first_sheet(bytes: &[u8]) -> Result<Range<Data>, AppError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| AppError::InvalidWorkbook(e.to_string()))?;
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::InvalidWorkbook("nenhuma planilha".into()))?
        .map_err(|e| AppError::InvalidWorkbook(e.to_string()))
}

fn cell(row: &[Data], column: Option<usize>) -> String {
    column
        .and_then(|i| row.get(i))
        .map(|c| cell_text(c).trim().to_string())
        .unwrap_or_default()
}

fn parse_uuid(raw: &str, code: &'static str) -> Result<Option<Uuid>, RowFailure> {
    if raw.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(raw).map(Some).map_err(|_| RowFailure::new(code, raw))
}

#[derive(Clone)]
pub struct TransferService {
    customers: CustomerService,
    custom_fields: CustomFieldService,
    directory: Arc<dyn StoreDirectory>,
}

impl TransferService {
    pub fn new(
        customers: CustomerService,
        custom_fields: CustomFieldService,
        directory: Arc<dyn StoreDirectory>,
    ) -> Self {
        Self { customers, custom_fields, directory }
    }

    // =========================================================================
    //  1. IMPORTAÇÃO
    // =========================================================================

    /// Processa as linhas uma a uma; uma linha ruim não derruba as outras.
    pub async fn import_customers(&self, scope: &ShopScope, bytes: &[u8]) -> Result<ImportReport, AppError> {
        let range = read_first_sheet(bytes)?;

        let mut rows = range.rows();
        let header = rows
            .next()
            .ok_or_else(|| AppError::InvalidWorkbook("planilha vazia".into()))?;

        let columns = ColumnMap::from_header(header)?;

        // Colunas personalizadas por loja (superadmin pode importar linhas de outra loja)
        let fields = self.custom_fields.list_fields(scope.shop_id).await?;
        let mut custom_by_shop: HashMap<Uuid, Vec<(usize, Uuid)>> = HashMap::new();
        custom_by_shop.insert(scope.shop_id, columns.custom_columns(&fields));

        let mut report = ImportReport::default();

        for (index, row) in rows.enumerate() {
            let row_number = index + 2;
            if row.iter().all(|c| cell_text(c).trim().is_empty()) {
                continue;
            }

            match self.import_row(scope, &columns, row).await {
                Ok((customer_id, shop_id)) => {
                    report.success_count += 1;
                    if !custom_by_shop.contains_key(&shop_id) {
                        let custom = match self.custom_fields.list_fields(shop_id).await {
                            Ok(fields) => columns.custom_columns(&fields),
                            Err(e) => {
                                tracing::warn!(shop = %shop_id, "Campos personalizados indisponíveis: {}", e);
                                Vec::new()
                            }
                        };
                        custom_by_shop.insert(shop_id, custom);
                    }
                    let custom = custom_by_shop.get(&shop_id).map(Vec::as_slice).unwrap_or_default();
                    self.write_custom_values(shop_id, customer_id, custom, row, row_number).await;
                }
                Err(failure) => report.push_error(row_number, failure),
            }
        }

        tracing::info!(
            shop = %scope.shop_id,
            success = report.success_count,
            errors = report.error_count,
            "📥 Importação de clientes concluída"
        );
        Ok(report)
    }

    async fn import_row(
        &self,
        scope: &ShopScope,
        columns: &ColumnMap,
        row: &[Data],
    ) -> Result<(Uuid, Uuid), RowFailure> {
        // 1. Campos obrigatórios
        let name = cell(row, Some(columns.name));
        if name.is_empty() {
            return Err(RowFailure::bare("missing_name"));
        }
        let raw_phone = cell(row, Some(columns.phone));
        if raw_phone.is_empty() {
            return Err(RowFailure::bare("missing_phone"));
        }
        let phone = normalize_phone(&raw_phone);
        if !is_valid_phone(&phone) {
            return Err(RowFailure::new("invalid_phone", raw_phone));
        }

        // 2. Colunas opcionais
        let id_raw = cell(row, columns.id);
        let id = parse_uuid(&id_raw, "invalid_id")?;

        let role_raw = cell(row, columns.role);
        let role = if role_raw.is_empty() {
            None
        } else {
            Some(
                role_raw
                    .parse::<CustomerRole>()
                    .map_err(|_| RowFailure::new("invalid_role", role_raw.as_str()))?,
            )
        };

        let otp_raw = cell(row, columns.otp_verify);
        let otp_verify = if otp_raw.is_empty() {
            None
        } else {
            Some(parse_flag(&otp_raw).ok_or_else(|| RowFailure::new("invalid_otp_verify", otp_raw.as_str()))?)
        };

        let shop_raw = cell(row, columns.shop_id);
        let shop_id = match parse_uuid(&shop_raw, "invalid_shop_id")? {
            None => scope.shop_id,
            Some(shop) if shop == scope.shop_id || scope.is_superadmin() => shop,
            Some(_) => return Err(RowFailure::new("shop_mismatch", shop_raw)),
        };

        // Loja de outra linha (só superadmin chega aqui) precisa existir
        if shop_id != scope.shop_id {
            let found = self
                .directory
                .find_store(shop_id)
                .await
                .map_err(|e| RowFailure::from_app_error(e, &id_raw, &shop_raw))?;
            if found.is_none() {
                return Err(RowFailure::new("shop_not_found", shop_raw));
            }
        }

        let branch_raw = cell(row, columns.branch_id);
        let branch_id = parse_uuid(&branch_raw, "invalid_branch_id")?;

        let line_token = Some(cell(row, columns.line_token)).filter(|t| !t.is_empty());

        // 3. Com ID: atualização de um cliente que precisa existir
        if let Some(id) = id {
            let existing = self
                .customers
                .find_in_shop(shop_id, id)
                .await
                .map_err(|e| RowFailure::from_app_error(e, &id_raw, &branch_raw))?;

            // Coluna ausente no cabeçalho = manter o valor atual
            let input = CustomerInput {
                name,
                phone,
                role: role.unwrap_or(existing.role),
                otp_verify: otp_verify.unwrap_or(existing.otp_verify),
                line_token: if columns.line_token.is_some() { line_token } else { existing.line_token },
                branch_id: if columns.branch_id.is_some() { branch_id } else { existing.branch_id },
                total_points: 0,
                custom_values: Vec::new(),
            };

            let updated = self
                .customers
                .update_customer(shop_id, id, input)
                .await
                .map_err(|e| RowFailure::from_app_error(e, &id_raw, &branch_raw))?;
            return Ok((updated.customer.id, shop_id));
        }

        // 4. Sem ID: criação
        let input = CustomerInput {
            name,
            phone,
            role: role.unwrap_or_default(),
            otp_verify: otp_verify.unwrap_or(false),
            line_token,
            branch_id,
            total_points: 0,
            custom_values: Vec::new(),
        };

        let created = self
            .customers
            .create_from_import(shop_id, input)
            .await
            .map_err(|e| RowFailure::from_app_error(e, &id_raw, &branch_raw))?;
        Ok((created.customer.id, shop_id))
    }

    /// Segunda passada: valores personalizados. Falha aqui só gera log.
    async fn write_custom_values(
        &self,
        shop_id: Uuid,
        customer_id: Uuid,
        custom: &[(usize, Uuid)],
        row: &[Data],
        row_number: usize,
    ) {
        let inputs: Vec<CustomValueInput> = custom
            .iter()
            .map(|(index, field_id)| CustomValueInput {
                field_id: *field_id,
                value: cell(row, Some(*index)),
            })
            .filter(|input| !input.value.is_empty())
            .collect();

        if inputs.is_empty() {
            return;
        }

        if let Err(e) = self.custom_fields.put_values(shop_id, customer_id, &inputs).await {
            tracing::warn!(
                row = row_number,
                customer = %customer_id,
                "Valores personalizados ignorados na importação: {}",
                e
            );
        }
    }

    // =========================================================================
    //  2. EXPORTAÇÃO
    // =========================================================================

    pub async fn export_customers(&self, scope: &ShopScope) -> Result<Vec<u8>, AppError> {
        let (customers, fields, values) = tokio::try_join!(
            self.customers.list_all(scope.shop_id, scope.branch_id),
            self.custom_fields.exportable_fields(scope.shop_id),
            self.custom_fields.list_values_for_shop(scope.shop_id),
        )?;

        let values: HashMap<(Uuid, Uuid), String> = values
            .into_iter()
            .map(|v| ((v.customer_id, v.field_id), v.value))
            .collect();

        let buffer = write_workbook(&customers, &fields, &values)?;
        tracing::info!(shop = %scope.shop_id, rows = customers.len(), "📤 Exportação de clientes gerada");
        Ok(buffer)
    }

    /// Só o cabeçalho: o modelo para preencher e importar.
    pub async fn import_template(&self, scope: &ShopScope) -> Result<Vec<u8>, AppError> {
        let fields = self.custom_fields.exportable_fields(scope.shop_id).await?;
        write_workbook(&[], &fields, &HashMap::new())
    }
}

fn write_workbook(
    customers: &[Customer],
    fields: &[CustomField],
    values: &HashMap<(Uuid, Uuid), String>,
) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    // 1. Cabeçalho: fixas + campos exportáveis
    let headers = FIXED_HEADERS.iter().copied().chain(fields.iter().map(|f| f.name.as_str()));
    for (col, title) in headers.enumerate() {
        worksheet.write_string_with_format(0, col as u16, title, &header_format)?;
        worksheet.set_column_width(col as u16, 18)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    // 2. Uma linha por cliente
    for (index, customer) in customers.iter().enumerate() {
        let row = index as u32 + 1;
        worksheet.write_string(row, 0, customer.id.to_string())?;
        worksheet.write_string(row, 1, &customer.name)?;
        // Telefone como texto para não perder o zero inicial
        worksheet.write_string(row, 2, &customer.phone)?;
        worksheet.write_string(row, 3, customer.role.as_str())?;
        worksheet.write_boolean(row, 4, customer.otp_verify)?;
        worksheet.write_string(row, 5, customer.line_token.as_deref().unwrap_or_default())?;
        worksheet.write_string(row, 6, customer.shop_id.to_string())?;
        worksheet.write_string(
            row,
            7,
            customer.branch_id.map(|b| b.to_string()).unwrap_or_default(),
        )?;
        worksheet.write_number(row, 8, customer.total_points as f64)?;
        worksheet.write_string(
            row,
            9,
            customer
                .last_checkin_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        )?;

        for (offset, field) in fields.iter().enumerate() {
            if let Some(value) = values.get(&(customer.id, field.id)) {
                worksheet.write_string(row, (FIXED_HEADERS.len() + offset) as u16, value)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::{
        db::{CustomFieldStore, CustomerStore, MemoryStore, StoreDirectory},
        middleware::auth::Session,
        models::{
            admin::AdminLevel,
            custom_field::{CustomFieldType, NewCustomField},
            customer::{CustomerChanges, NewCustomer},
        },
    };

    /// Conta as escritas que chegam ao store de clientes.
    struct CountingCustomers {
        inner: Arc<MemoryStore>,
        creates: AtomicUsize,
        updates: AtomicUsize,
    }

    #[async_trait]
    impl CustomerStore for CountingCustomers {
        async fn list_customers(&self, shop_id: Uuid, branch_id: Option<Uuid>) -> Result<Vec<Customer>, AppError> {
            self.inner.list_customers(shop_id, branch_id).await
        }
        async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
            self.inner.find_customer(id).await
        }
        async fn find_customer_by_phone(
            &self,
            shop_id: Uuid,
            branch_id: Option<Uuid>,
            phone: &str,
        ) -> Result<Option<Customer>, AppError> {
            self.inner.find_customer_by_phone(shop_id, branch_id, phone).await
        }
        async fn create_customer(&self, new: NewCustomer) -> Result<Customer, AppError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.inner.create_customer(new).await
        }
        async fn update_customer(&self, id: Uuid, changes: CustomerChanges) -> Result<Option<Customer>, AppError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            self.inner.update_customer(id, changes).await
        }
        async fn delete_customer(&self, id: Uuid) -> Result<bool, AppError> {
            self.inner.delete_customer(id).await
        }
        async fn customer_points(&self, id: Uuid) -> Result<Option<i64>, AppError> {
            self.inner.customer_points(id).await
        }
        async fn adjust_points(&self, id: Uuid, delta: i64) -> Result<Option<i64>, AppError> {
            self.inner.adjust_points(id, delta).await
        }
        async fn record_checkin(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Customer>, AppError> {
            self.inner.record_checkin(id, at).await
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        counting: Arc<CountingCustomers>,
        service: TransferService,
        scope: ShopScope,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let shop = store.create_store("Coffee Lab").await.unwrap();
        let counting = Arc::new(CountingCustomers {
            inner: store.clone(),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        });

        let fields = CustomFieldService::new(store.clone());
        let customers = CustomerService::new(counting.clone(), store.clone(), fields.clone());
        let scope = ShopScope {
            shop_id: shop.id,
            branch_id: None,
            session: Session {
                admin_id: Uuid::new_v4(),
                username: "staff".into(),
                level: AdminLevel::Admin,
                shop_id: Some(shop.id),
                branch_id: None,
            },
        };

        let service = TransferService::new(customers, fields, store.clone());
        Fixture {
            store,
            counting,
            service,
            scope,
        }
    }

    fn sheet(rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    worksheet.write_string(r as u32, c as u16, *value).unwrap();
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    fn read_back(bytes: Vec<u8>) -> Vec<Vec<String>> {
        let range = read_first_sheet(&bytes).unwrap();
        range.rows().map(|row| row.iter().map(cell_text).collect()).collect()
    }

    const HEADER: &[&str] = &["ID", "ชื่อ", "เบอร์โทรศัพท์", "Role", "OTP Verify"];

    #[tokio::test]
    async fn creates_and_updates_rows() {
        let f = fixture().await;
        let existing = f
            .store
            .create_customer(NewCustomer {
                name: "Old name".into(),
                phone: "0811111111".into(),
                role: CustomerRole::Customer,
                otp_verify: false,
                line_token: None,
                shop_id: f.scope.shop_id,
                branch_id: None,
                total_points: 40,
            })
            .await
            .unwrap();
        let existing_id = existing.id.to_string();

        let bytes = sheet(&[
            HEADER,
            &["", "Somchai", "081-234-5678", "adminshop", "ใช่"],
            &[&existing_id, "New name", "0811111111", "", "true"],
        ]);

        let report = f.service.import_customers(&f.scope, &bytes).await.unwrap();
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 0);

        let updated = f.store.find_customer(existing.id).await.unwrap().unwrap();
        assert_eq!(updated.name, "New name");
        assert!(updated.otp_verify);
        // Pontos não vêm da planilha
        assert_eq!(updated.total_points, 40);

        let created = f
            .store
            .find_customer_by_phone(f.scope.shop_id, None, "0812345678")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.role, CustomerRole::Adminshop);
        assert!(created.otp_verify);
    }

    #[tokio::test]
    async fn duplicate_phone_without_id_never_reaches_create() {
        let f = fixture().await;
        let bytes = sheet(&[
            HEADER,
            &["", "Somchai", "0812345678", "", ""],
            &["", "Somchai again", "0812345678", "", ""],
        ]);

        let report = f.service.import_customers(&f.scope, &bytes).await.unwrap();
        assert_eq!(report.success_count, 1);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.errors[0].row, 3);
        assert_eq!(report.errors[0].code, "duplicate_phone");
        assert_eq!(f.counting.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_id_never_reaches_update() {
        let f = fixture().await;
        let ghost = Uuid::new_v4().to_string();
        let bytes = sheet(&[
            HEADER,
            &[&ghost, "Ghost", "0812345678", "", ""],
            &["not-a-uuid", "Broken", "0899999999", "", ""],
        ]);

        let report = f.service.import_customers(&f.scope, &bytes).await.unwrap();
        assert_eq!(report.success_count, 0);
        assert_eq!(report.error_count, 2);
        assert_eq!(report.errors[0].code, "customer_not_found");
        assert_eq!(report.errors[1].code, "invalid_id");
        assert_eq!(f.counting.updates.load(Ordering::SeqCst), 0);
        assert_eq!(f.counting.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bad_rows_are_counted_and_processing_continues() {
        let f = fixture().await;
        let other_shop = Uuid::new_v4().to_string();
        let bytes = sheet(&[
            &["ชื่อ", "เบอร์โทรศัพท์", "Role", "รหัสร้านค้า"],
            &["", "0812345678", "", ""],
            &["No phone", "", "", ""],
            &["Bad role", "0812345678", "vip", ""],
            &["Other shop", "0812345678", "", &other_shop],
            &["", "", "", ""],
            &["Good", "0812345678", "", ""],
        ]);

        let mut report = f.service.import_customers(&f.scope, &bytes).await.unwrap();
        assert_eq!(report.success_count, 1);
        assert_eq!(report.error_count, 4);
        let codes: Vec<_> = report.errors.iter().map(|e| (e.row, e.code.as_str())).collect();
        assert_eq!(
            codes,
            vec![(2, "missing_name"), (3, "missing_phone"), (4, "invalid_role"), (5, "shop_mismatch")]
        );

        let i18n = I18nStore::embedded().unwrap();
        report.localize("en", &i18n);
        assert!(report.errors[2].message.contains("Row 4"));
        assert!(report.errors[2].message.contains("vip"));
    }

    #[tokio::test]
    async fn header_without_required_columns_is_rejected() {
        let f = fixture().await;
        let bytes = sheet(&[&["ID", "Name only"], &["", "x"]]);
        let err = f.service.import_customers(&f.scope, &bytes).await;
        assert!(matches!(err, Err(AppError::InvalidWorkbook(_))));

        let err = f.service.import_customers(&f.scope, b"not a workbook").await;
        assert!(matches!(err, Err(AppError::InvalidWorkbook(_))));
    }

    #[tokio::test]
    async fn custom_columns_are_imported_and_bad_values_swallowed() {
        let f = fixture().await;
        let field = f
            .store
            .create_field(NewCustomField {
                shop_id: f.scope.shop_id,
                name: "Member No".into(),
                field_type: CustomFieldType::Number,
                options: None,
                is_required: false,
                is_exportable: true,
                sort_order: 0,
            })
            .await
            .unwrap();

        let bytes = sheet(&[
            &["ชื่อ", "เบอร์โทรศัพท์", "Member No"],
            &["Somchai", "0812345678", "42"],
            &["Anna", "0899999999", "not a number"],
        ]);

        let report = f.service.import_customers(&f.scope, &bytes).await.unwrap();
        // O valor inválido não conta como erro da linha
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 0);

        let somchai = f
            .store
            .find_customer_by_phone(f.scope.shop_id, None, "0812345678")
            .await
            .unwrap()
            .unwrap();
        let values = f.store.list_values(somchai.id).await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].field_id, field.id);
        assert_eq!(values[0].value, "42");
    }

    #[tokio::test]
    async fn required_custom_field_does_not_fail_new_rows() {
        let f = fixture().await;
        let field = f
            .store
            .create_field(NewCustomField {
                shop_id: f.scope.shop_id,
                name: "Member No".into(),
                field_type: CustomFieldType::Text,
                options: None,
                is_required: true,
                is_exportable: true,
                sort_order: 0,
            })
            .await
            .unwrap();

        let bytes = sheet(&[
            &["ชื่อ", "เบอร์โทรศัพท์", "Member No"],
            &["Somchai", "0812345678", "A-1"],
            &["Anna", "0899999999", ""],
        ]);

        let report = f.service.import_customers(&f.scope, &bytes).await.unwrap();
        // Campo obrigatório vazio só falha na segunda passada, que não conta
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 0);

        let somchai = f
            .store
            .find_customer_by_phone(f.scope.shop_id, None, "0812345678")
            .await
            .unwrap()
            .unwrap();
        let values = f.store.list_values(somchai.id).await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].field_id, field.id);
        assert_eq!(values[0].value, "A-1");

        let anna = f
            .store
            .find_customer_by_phone(f.scope.shop_id, None, "0899999999")
            .await
            .unwrap()
            .unwrap();
        assert!(f.store.list_values(anna.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn superadmin_rows_use_the_row_shop_fields_and_must_name_a_real_shop() {
        let f = fixture().await;
        let other = f.store.create_store("Tea House").await.unwrap();
        let other_field = f
            .store
            .create_field(NewCustomField {
                shop_id: other.id,
                name: "Member No".into(),
                field_type: CustomFieldType::Text,
                options: None,
                is_required: false,
                is_exportable: true,
                sort_order: 0,
            })
            .await
            .unwrap();

        let mut scope = f.scope.clone();
        scope.session.level = AdminLevel::Superadmin;
        scope.session.shop_id = None;

        let other_id = other.id.to_string();
        let ghost = Uuid::new_v4().to_string();
        let bytes = sheet(&[
            &["ชื่อ", "เบอร์โทรศัพท์", "รหัสร้านค้า", "Member No"],
            &["Somchai", "0812345678", &other_id, "T-9"],
            &["Nobody", "0899999999", &ghost, "X"],
        ]);

        let report = f.service.import_customers(&scope, &bytes).await.unwrap();
        assert_eq!(report.success_count, 1);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.errors[0].row, 3);
        assert_eq!(report.errors[0].code, "shop_not_found");
        assert_eq!(f.counting.creates.load(Ordering::SeqCst), 1);

        let somchai = f
            .store
            .find_customer_by_phone(other.id, None, "0812345678")
            .await
            .unwrap()
            .unwrap();
        let values = f.store.list_values(somchai.id).await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].field_id, other_field.id);
        assert_eq!(values[0].value, "T-9");
    }

    #[tokio::test]
    async fn export_has_fixed_columns_plus_exportable_fields() {
        let f = fixture().await;
        for (name, exportable) in [("Member No", true), ("Birthday", true), ("Internal", false)] {
            f.store
                .create_field(NewCustomField {
                    shop_id: f.scope.shop_id,
                    name: name.into(),
                    field_type: CustomFieldType::Text,
                    options: None,
                    is_required: false,
                    is_exportable: exportable,
                    sort_order: 0,
                })
                .await
                .unwrap();
        }
        let bytes = sheet(&[&["ชื่อ", "เบอร์โทรศัพท์", "Member No"], &["Somchai", "0812345678", "A-1"]]);
        f.service.import_customers(&f.scope, &bytes).await.unwrap();

        let rows = read_back(f.service.export_customers(&f.scope).await.unwrap());
        assert_eq!(rows[0].len(), FIXED_HEADERS.len() + 2);
        assert_eq!(rows[0][..10], FIXED_HEADERS.map(String::from));
        assert_eq!(rows[0][10], "Birthday");
        assert_eq!(rows[0][11], "Member No");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "Somchai");
        assert_eq!(rows[1][2], "0812345678");
        assert_eq!(rows[1][11], "A-1");

        let template = read_back(f.service.import_template(&f.scope).await.unwrap());
        assert_eq!(template.len(), 1);
        assert_eq!(template[0].len(), FIXED_HEADERS.len() + 2);
    }

    #[tokio::test]
    async fn exported_workbook_imports_back_as_updates() {
        let f = fixture().await;
        let bytes = sheet(&[HEADER, &["", "Somchai", "0812345678", "", ""]]);
        f.service.import_customers(&f.scope, &bytes).await.unwrap();

        let exported = f.service.export_customers(&f.scope).await.unwrap();
        let report = f.service.import_customers(&f.scope, &exported).await.unwrap();
        assert_eq!(report.success_count, 1);
        assert_eq!(f.counting.creates.load(Ordering::SeqCst), 1);
        assert_eq!(f.counting.updates.load(Ordering::SeqCst), 1);
        assert_eq!(f.store.list_customers(f.scope.shop_id, None).await.unwrap().len(), 1);
    }
}

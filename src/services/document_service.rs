// src/services/document_service.rs

use std::fmt::Display;

use genpdf::{elements, style, Alignment, Element};
use image::Luma;
use qrcode::QrCode;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::SettingsRepository,
    models::{
        inventory::MeasureUnit,
        purchasing::PurchaseOrderDetail,
        sales::{PaymentMethod, SaleDetail},
        settings::TenantSettings,
    },
    services::{purchasing_service::PurchasingService, sales_service::SalesService},
};

const FONT_FAMILY: &str = "Roboto";
const DEFAULT_TITLE: &str = "DOCERIA";

/// Valor em reais no formato brasileiro: R$ 1.234,56
pub fn format_brl(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}R$ {},{}", if negative { "-" } else { "" }, grouped, frac_part)
}

pub fn unit_label(unit: MeasureUnit) -> &'static str {
    match unit {
        MeasureUnit::Kg => "kg",
        MeasureUnit::G => "g",
        MeasureUnit::L => "L",
        MeasureUnit::Ml => "mL",
        MeasureUnit::Un => "un",
    }
}

pub fn payment_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Cash => "Dinheiro",
        PaymentMethod::Card => "Cartão",
        PaymentMethod::Pix => "PIX",
    }
}

/// Conteúdo do QR Code do pedido de compra (conferência no recebimento).
pub fn purchase_order_reference(order: &PurchaseOrderDetail) -> String {
    format!(
        "PC-{}|{}|{}|{}",
        order.header.display_id,
        order.supplier_name,
        order.header.total_amount.round_dp(2),
        order.header.id
    )
}

fn pdf_error(e: impl Display) -> AppError {
    AppError::InternalServerError(anyhow::anyhow!("Falha ao gerar PDF: {e}"))
}

#[derive(Clone)]
pub struct DocumentService {
    purchasing_service: PurchasingService,
    sales_service: SalesService,
    settings_repo: SettingsRepository,
    fonts_dir: String,
}

impl DocumentService {
    pub fn new(
        purchasing_service: PurchasingService,
        sales_service: SalesService,
        settings_repo: SettingsRepository,
        fonts_dir: String,
    ) -> Self {
        Self { purchasing_service, sales_service, settings_repo, fonts_dir }
    }

    /// PDF do pedido de compra (GET /api/pdf/pedido-compra/{id}).
    pub async fn purchase_order_pdf(&self, conn: &mut PgConnection, tenant_id: Uuid, order_id: Uuid) -> Result<Vec<u8>, AppError> {
        // 1. Busca os Dados
        let order = self.purchasing_service.get_order(&mut *conn, tenant_id, order_id).await?;
        let settings = self.settings_repo.get_settings(&mut *conn, tenant_id).await?;

        // 2. Cabeçalho
        let mut doc = self.new_document(format!("Pedido de compra #{}", order.header.display_id))?;
        push_company_header(&mut doc, &settings);

        doc.push(
            elements::Paragraph::new(format!("PEDIDO DE COMPRA #{}", order.header.display_id))
                .styled(style::Style::new().bold().with_font_size(14)),
        );
        doc.push(elements::Paragraph::new(format!("Fornecedor: {}", order.supplier_name)));
        doc.push(elements::Paragraph::new(format!("Emitido em: {}", order.header.created_at.format("%d/%m/%Y"))));
        if let Some(expected) = order.header.expected_date {
            doc.push(elements::Paragraph::new(format!("Entrega prevista: {}", expected.format("%d/%m/%Y"))));
        }
        doc.push(elements::Break::new(2));

        // 3. Itens (Insumo, Qtd, Unitário, Total)
        let mut table = elements::TableLayout::new(vec![4, 2, 2, 2]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
        let bold = style::Style::new().bold();
        table
            .row()
            .element(elements::Paragraph::new("Insumo").styled(bold))
            .element(elements::Paragraph::new("Qtd").styled(bold))
            .element(elements::Paragraph::new("Unitário").styled(bold))
            .element(elements::Paragraph::new("Total").styled(bold))
            .push()
            .map_err(pdf_error)?;

        for item in &order.items {
            table
                .row()
                .element(elements::Paragraph::new(item.ingredient_name.clone()))
                .element(elements::Paragraph::new(format!(
                    "{} {}",
                    item.quantity.normalize(),
                    unit_label(item.unit)
                )))
                .element(elements::Paragraph::new(format_brl(item.unit_cost)))
                .element(elements::Paragraph::new(format_brl(item.line_total())))
                .push()
                .map_err(pdf_error)?;
        }
        doc.push(table);
        doc.push(elements::Break::new(2));

        let mut total = elements::Paragraph::new(format!("TOTAL: {}", format_brl(order.header.total_amount)));
        total.set_alignment(Alignment::Right);
        doc.push(total.styled(style::Style::new().bold().with_font_size(12)));

        if let Some(notes) = &order.header.notes {
            doc.push(elements::Break::new(1));
            doc.push(elements::Paragraph::new(format!("Observações: {notes}")));
        }

        // 4. QR Code de conferência
        doc.push(elements::Break::new(2));
        doc.push(qr_image(&purchase_order_reference(&order))?);

        push_footer(&mut doc, &settings);
        render(doc)
    }

    /// Recibo da venda, com QR Code PIX quando a loja tem chave cadastrada.
    pub async fn sale_receipt_pdf(&self, conn: &mut PgConnection, tenant_id: Uuid, sale_id: Uuid) -> Result<Vec<u8>, AppError> {
        let sale: SaleDetail = self.sales_service.get_sale(&mut *conn, tenant_id, sale_id).await?;
        let settings = self.settings_repo.get_settings(&mut *conn, tenant_id).await?;

        let mut doc = self.new_document(format!("Venda #{}", sale.header.display_id))?;
        push_company_header(&mut doc, &settings);

        doc.push(
            elements::Paragraph::new(format!("RECIBO DE VENDA #{}", sale.header.display_id))
                .styled(style::Style::new().bold().with_font_size(14)),
        );
        doc.push(elements::Paragraph::new(format!("Data: {}", sale.header.created_at.format("%d/%m/%Y %H:%M"))));
        doc.push(elements::Paragraph::new(format!(
            "Cliente: {}",
            sale.customer_name.as_deref().unwrap_or("Consumidor Final")
        )));
        doc.push(elements::Paragraph::new(format!("Pagamento: {}", payment_label(sale.header.payment_method))));
        doc.push(elements::Break::new(2));

        let mut table = elements::TableLayout::new(vec![4, 1, 2, 2]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
        let bold = style::Style::new().bold();
        table
            .row()
            .element(elements::Paragraph::new("Produto").styled(bold))
            .element(elements::Paragraph::new("Qtd").styled(bold))
            .element(elements::Paragraph::new("Unitário").styled(bold))
            .element(elements::Paragraph::new("Total").styled(bold))
            .push()
            .map_err(pdf_error)?;

        for item in &sale.items {
            table
                .row()
                .element(elements::Paragraph::new(item.product_name.clone()))
                .element(elements::Paragraph::new(item.quantity.normalize().to_string()))
                .element(elements::Paragraph::new(format_brl(item.unit_price)))
                .element(elements::Paragraph::new(format_brl(item.quantity * item.unit_price - item.discount)))
                .push()
                .map_err(pdf_error)?;
        }
        doc.push(table);
        doc.push(elements::Break::new(1));

        let mut lines = vec![format!("Subtotal: {}", format_brl(sale.header.subtotal))];
        if !sale.header.discount_total.is_zero() {
            lines.push(format!("Descontos: -{}", format_brl(sale.header.discount_total)));
        }
        if !sale.header.loyalty_discount.is_zero() {
            lines.push(format!(
                "Pontos ({}): -{}",
                sale.header.points_redeemed,
                format_brl(sale.header.loyalty_discount)
            ));
        }
        for line in lines {
            let mut p = elements::Paragraph::new(line);
            p.set_alignment(Alignment::Right);
            doc.push(p);
        }
        let mut total = elements::Paragraph::new(format!("TOTAL: {}", format_brl(sale.header.total)));
        total.set_alignment(Alignment::Right);
        doc.push(total.styled(style::Style::new().bold().with_font_size(12)));

        if sale.header.points_earned > 0 {
            doc.push(elements::Paragraph::new(format!("Pontos ganhos: {}", sale.header.points_earned)));
        }

        // PIX: QR Code com a chave da loja
        if let Some(key) = settings.pix_key.as_deref().filter(|k| !k.trim().is_empty()) {
            doc.push(elements::Break::new(2));
            doc.push(elements::Paragraph::new("PAGAMENTO VIA PIX").styled(style::Style::new().bold().with_font_size(12)));
            doc.push(elements::Paragraph::new(format!("Chave: {key}")));
            doc.push(elements::Break::new(1));
            doc.push(qr_image(key)?);
        }

        push_footer(&mut doc, &settings);
        render(doc)
    }

    fn new_document(&self, title: String) -> Result<genpdf::Document, AppError> {
        // Carrega a fonte da pasta configurada (PDF_FONTS_DIR)
        let font_family = genpdf::fonts::from_files(&self.fonts_dir, FONT_FAMILY, None)
            .map_err(|_| AppError::FontNotFound(format!("{FONT_FAMILY} em {}", self.fonts_dir)))?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(title);
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);
        Ok(doc)
    }
}

fn push_company_header(doc: &mut genpdf::Document, settings: &TenantSettings) {
    let title = settings.company_name.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string());
    doc.push(elements::Paragraph::new(title).styled(style::Style::new().bold().with_font_size(18)));

    if let Some(doc_num) = &settings.document_number {
        doc.push(elements::Paragraph::new(format!("CNPJ/CPF: {doc_num}")).styled(style::Style::new().with_font_size(10)));
    }
    if let Some(phone) = &settings.phone {
        doc.push(elements::Paragraph::new(format!("Tel: {phone}")).styled(style::Style::new().with_font_size(10)));
    }
    doc.push(elements::Break::new(1.5));
}

fn push_footer(doc: &mut genpdf::Document, settings: &TenantSettings) {
    if let Some(addr) = &settings.address {
        doc.push(elements::Break::new(2));
        doc.push(elements::Paragraph::new(addr.clone()).styled(style::Style::new().italic().with_font_size(8)));
    }
}

fn qr_image(content: &str) -> Result<elements::Image, AppError> {
    let code = QrCode::new(content.as_bytes()).map_err(pdf_error)?;
    let buffer = code.render::<Luma<u8>>().build();

    let image = elements::Image::from_dynamic_image(image::DynamicImage::ImageLuma8(buffer))
        .map_err(pdf_error)?
        .with_scale(genpdf::Scale::new(0.5, 0.5));
    Ok(image)
}

// Renderiza para Buffer (memória)
fn render(doc: genpdf::Document) -> Result<Vec<u8>, AppError> {
    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(pdf_error)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn formats_reais_with_brazilian_separators() {
        assert_eq!(format_brl(Decimal::from_str("1234.5").unwrap()), "R$ 1.234,50");
        assert_eq!(format_brl(Decimal::from_str("0.456").unwrap()), "R$ 0,46");
        assert_eq!(format_brl(Decimal::from_str("1000000").unwrap()), "R$ 1.000.000,00");
        assert_eq!(format_brl(Decimal::from_str("-12.3").unwrap()), "-R$ 12,30");
    }

    #[test]
    fn labels_are_human_readable() {
        assert_eq!(unit_label(MeasureUnit::Kg), "kg");
        assert_eq!(payment_label(PaymentMethod::Pix), "PIX");
    }

    #[test]
    fn missing_font_directory_is_reported() {
        let err = genpdf::fonts::from_files("/caminho/inexistente", FONT_FAMILY, None);
        assert!(err.is_err());
    }
}

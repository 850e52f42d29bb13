// src/services/document_service.rs

use chrono::NaiveDate;
use genpdf::{Element, elements, style};
use image::Luma;
use qrcode::QrCode;
use rust_decimal::Decimal;

use crate::common::error::AppError;

// Dados do comprovante de transferência gerado para pagamentos por
// transferência bancária.
#[derive(Debug, Clone)]
pub struct ReceiptData {
    pub supplier_name: String,
    pub invoice_number: String,
    pub amount: Decimal,
    pub date: NaiveDate,
}

#[derive(Clone)]
pub struct DocumentService {
    fonts_dir: String,
}

impl DocumentService {
    pub fn new(fonts_dir: String) -> Self {
        Self { fonts_dir }
    }

    /// Gera o comprovante de transferência em PDF, em memória.
    pub fn transfer_receipt_pdf(&self, data: &ReceiptData) -> Result<Vec<u8>, AppError> {
        // Carrega a fonte da pasta configurada
        let font_family = genpdf::fonts::from_files(&self.fonts_dir, "Roboto", None)
            .map_err(|_| {
                AppError::FontNotFound(format!("Fonte não encontrada na pasta {}", self.fonts_dir))
            })?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(format!("Comprobante {}", data.invoice_number));
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        doc.push(
            elements::Paragraph::new("Comprobante de Transferencia")
                .styled(style::Style::new().bold().with_font_size(18)),
        );
        doc.push(elements::Break::new(1.5));

        doc.push(elements::Paragraph::new(format!("Proveedor: {}", data.supplier_name)));
        doc.push(elements::Paragraph::new(format!("Factura: {}", data.invoice_number)));
        doc.push(elements::Paragraph::new(format!("Monto: ${:.2}", data.amount)));
        doc.push(elements::Paragraph::new(format!(
            "Fecha: {}",
            data.date.format("%d/%m/%Y")
        )));
        doc.push(elements::Break::new(2));

        // QR com a referência do pagamento, para conferência rápida.
        let reference = format!("{}|{:.2}", data.invoice_number, data.amount);
        let code = QrCode::new(reference.as_bytes())
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

        let image_buffer = code.render::<Luma<u8>>().build();
        let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);

        let pdf_image = genpdf::elements::Image::from_dynamic_image(dynamic_image)
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?
            .with_scale(genpdf::Scale::new(0.5, 0.5));
        doc.push(pdf_image);

        doc.push(elements::Break::new(2));
        doc.push(
            elements::Paragraph::new("Generado por FERRETERIA App")
                .styled(style::Style::new().italic().with_font_size(8)),
        );

        // Renderiza para buffer (memória)
        let mut buffer = Vec::new();
        doc.render(&mut buffer)
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

        Ok(buffer)
    }
}

// src/services/pdf_service.rs

use std::path::PathBuf;

use chrono::Local;
use genpdf::{elements, style, Alignment, Element, Size};

use crate::{
    common::error::AppError,
    models::commission::{CommissionReport, ReportRowView},
};

/// Linhas de detalhe que cabem no PDF. O resto fica só na tela.
pub const PDF_MAX_ROWS: usize = 20;

const TITLE: &str = "Relatório de Comissionamento por Cedente";
const FOOTER: &str = "Nota: Este relatório contém informações confidenciais.";

/// Conteúdo do PDF já decidido, sem nada de layout de página.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfTable {
    pub title: String,
    pub generated_at: String,
    pub header: Vec<&'static str>,
    pub weights: Vec<usize>,
    /// Daqui em diante as colunas são numéricas e vão alinhadas à direita.
    pub first_numeric: usize,
    pub rows: Vec<Vec<String>>,
    pub total: Option<Vec<String>>,
    pub footer: String,
}

pub fn build_table(report: &CommissionReport) -> PdfTable {
    let mut header = Vec::new();
    let mut weights = Vec::new();

    if report.has_captador {
        header.push("CAPTADOR");
        weights.push(2);
    }
    header.extend(["CEDENTE", "GERENTE", "ETAPA", "DATA"]);
    weights.extend([7, 2, 2, 2]);
    let first_numeric = header.len();
    if report.has_prazo_medio {
        header.push("PRAZO MEDIO");
        weights.push(2);
    }
    header.extend(["DESAGIO", "VALOR OPERADO"]);
    weights.extend([3, 3]);

    let rows = report
        .rows_with_total
        .iter()
        .filter(|r| !r.is_total)
        .take(PDF_MAX_ROWS)
        .map(|r| cells(r, report.has_captador, report.has_prazo_medio))
        .collect();

    let total = report
        .rows_with_total
        .iter()
        .find(|r| r.is_total)
        .map(|r| cells(r, report.has_captador, report.has_prazo_medio));

    let mut footer = FOOTER.to_string();
    let detail_rows = report.rows.len();
    if detail_rows > PDF_MAX_ROWS {
        footer.push_str(&format!(
            " Apenas as primeiras {} de {} linhas são mostradas no PDF.",
            PDF_MAX_ROWS, detail_rows
        ));
    }

    let title = if report.filtered {
        format!("{} (Filtrado)", TITLE)
    } else {
        TITLE.to_string()
    };

    PdfTable {
        title,
        generated_at: format!("Gerado em: {}", Local::now().format("%d/%m/%Y %H:%M:%S")),
        header,
        weights,
        first_numeric,
        rows,
        total,
        footer,
    }
}

fn cells(row: &ReportRowView, has_captador: bool, has_prazo_medio: bool) -> Vec<String> {
    let mut out = Vec::with_capacity(8);
    if has_captador {
        out.push(row.captador.clone().unwrap_or_default());
    }
    out.extend([row.cedente.clone(), row.gerente.clone(), row.etapa.clone(), row.data.clone()]);
    if has_prazo_medio {
        out.push(row.prazo_medio.clone().unwrap_or_default());
    }
    out.extend([row.desagio.clone(), row.valor_operado.clone()]);
    out
}

#[derive(Clone)]
pub struct PdfService {
    fonts_dir: PathBuf,
    font_family: String,
}

impl PdfService {
    pub fn new(fonts_dir: impl Into<PathBuf>, font_family: impl Into<String>) -> Self {
        Self { fonts_dir: fonts_dir.into(), font_family: font_family.into() }
    }

    /// Renderiza o relatório em PDF (carta, paisagem). Bloqueante: chamar
    /// de dentro de `spawn_blocking`.
    pub fn render(&self, report: &CommissionReport) -> Result<Vec<u8>, AppError> {
        let table = build_table(report);

        let font_family = genpdf::fonts::from_files(&self.fonts_dir, &self.font_family, None)
            .map_err(|e| {
                AppError::FontNotFound(format!(
                    "{} em {}: {}",
                    self.font_family,
                    self.fonts_dir.display(),
                    e
                ))
            })?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(table.title.clone());
        doc.set_paper_size(Size::new(279, 216));
        doc.set_font_size(8);
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // --- CABEÇALHO ---
        let mut title = elements::Paragraph::new(table.title.clone());
        title.set_alignment(Alignment::Center);
        doc.push(title.styled(style::Style::new().bold().with_font_size(16)));
        doc.push(elements::Paragraph::new(table.generated_at.clone()));
        doc.push(elements::Break::new(1));

        // --- TABELA ---
        let mut layout = elements::TableLayout::new(table.weights.clone());
        layout.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

        let bold = style::Style::new().bold();
        let mut header_row = layout.row();
        for (i, name) in table.header.iter().enumerate() {
            header_row.push_element(cell(name, i >= table.first_numeric).styled(bold));
        }
        header_row.push().map_err(pdf_error)?;

        for values in &table.rows {
            let mut row = layout.row();
            for (i, value) in values.iter().enumerate() {
                row.push_element(cell(value, i >= table.first_numeric));
            }
            row.push().map_err(pdf_error)?;
        }

        if let Some(values) = &table.total {
            let mut row = layout.row();
            for (i, value) in values.iter().enumerate() {
                row.push_element(cell(value, i >= table.first_numeric).styled(bold));
            }
            row.push().map_err(pdf_error)?;
        }

        doc.push(layout);
        doc.push(elements::Break::new(1));

        // --- RODAPÉ ---
        doc.push(
            elements::Paragraph::new(table.footer.clone())
                .styled(style::Style::new().italic().with_font_size(7)),
        );

        let mut buffer = Vec::new();
        doc.render(&mut buffer).map_err(pdf_error)?;
        Ok(buffer)
    }
}

fn cell(text: &str, numeric: bool) -> elements::Paragraph {
    let mut p = elements::Paragraph::new(text.to_string());
    if numeric {
        p.set_alignment(Alignment::Right);
    }
    p
}

fn pdf_error(e: genpdf::error::Error) -> AppError {
    AppError::PdfRender(e.to_string())
}

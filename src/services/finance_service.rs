// src/services/finance_service.rs

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Connection, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{field_error, AppError},
    db::FinanceRepository,
    models::finance::{
        DreExpenseLine, DreLine, DreQuery, DreReport, ExpenseCategory, ExpenseCategoryPayload, ExpenseTotal, Payable,
        PayablePayload, PayableQuery, PayableStatus, PayableView, PayPayload, SalesTarget, SalesTotals, TargetPayload,
        TargetProgress,
    },
};

// ---
// Contas a pagar
// ---

/// Aplica um pagamento (total ou parcial) e devolve o novo saldo e status.
pub fn apply_payment(payable: &Payable, amount: Option<Decimal>) -> Result<(Decimal, PayableStatus), AppError> {
    if !payable.status.is_open() {
        return Err(AppError::InvalidStatusTransition {
            from: payable.status.as_str().to_string(),
            to: PayableStatus::Paid.as_str().to_string(),
        });
    }

    let paid = amount.unwrap_or(payable.balance);
    if paid > payable.balance {
        return Err(field_error(
            "amount",
            "exceeds_balance",
            &format!("O valor pago é maior que o saldo de {}.", payable.balance.normalize()),
        ));
    }

    let balance = payable.balance - paid;
    let status = if balance.is_zero() { PayableStatus::Paid } else { PayableStatus::Partial };
    Ok((balance, status))
}

// ---
// DRE
// ---

/// % sobre a receita líquida; 0 quando não houve receita.
pub fn percent_of(value: Decimal, net_revenue: Decimal) -> Decimal {
    if net_revenue.is_zero() {
        return Decimal::ZERO;
    }
    (value / net_revenue * Decimal::ONE_HUNDRED).round_dp(2)
}

pub fn build_dre(from: NaiveDate, to: NaiveDate, sales: &SalesTotals, expenses: &[ExpenseTotal]) -> DreReport {
    let net_revenue = sales.gross_revenue - sales.discounts;
    let gross_profit = net_revenue - sales.cost_of_goods_sold;
    let total_expenses: Decimal = expenses.iter().map(|e| e.total).sum();
    let operating_result = gross_profit - total_expenses;

    let line = |label: &str, value: Decimal| DreLine {
        label: label.to_string(),
        value,
        percent: percent_of(value, net_revenue),
    };

    DreReport {
        from,
        to,
        sales_count: sales.sales_count,
        gross_revenue: line("Receita bruta", sales.gross_revenue),
        discounts: line("(-) Descontos", sales.discounts),
        net_revenue: line("Receita líquida", net_revenue),
        cost_of_goods_sold: line("(-) CMV", sales.cost_of_goods_sold),
        gross_profit: line("Lucro bruto", gross_profit),
        expenses: expenses
            .iter()
            .map(|e| DreExpenseLine {
                category_id: e.category_id,
                category_name: e.category_name.clone(),
                expense_group: e.expense_group,
                value: e.total,
                percent: percent_of(e.total, net_revenue),
            })
            .collect(),
        total_expenses: line("(-) Despesas", total_expenses),
        operating_result: line("Resultado operacional", operating_result),
    }
}

// ---
// Metas
// ---

/// Primeiro e último dia do mês.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

/// Realizado, % da meta, quanto falta e projeção linear para o fim do mês.
pub fn target_progress(target: &SalesTarget, achieved: Decimal, today: NaiveDate) -> TargetProgress {
    let (elapsed, days_in_month) = match month_bounds(target.year, target.month as u32) {
        Some((first, last)) => {
            let days = last.day() as i64;
            let elapsed = if today < first {
                0
            } else if today > last {
                days
            } else {
                today.day() as i64
            };
            (elapsed, days)
        }
        None => (0, 0),
    };

    let projection = if elapsed == 0 {
        Decimal::ZERO
    } else {
        (achieved / Decimal::from(elapsed) * Decimal::from(days_in_month)).round_dp(2)
    };
    let percent = if target.target_amount.is_zero() {
        Decimal::ZERO
    } else {
        (achieved / target.target_amount * Decimal::ONE_HUNDRED).round_dp(2)
    };

    TargetProgress {
        target_id: target.id,
        location_id: target.location_id,
        target_amount: target.target_amount,
        achieved,
        percent,
        remaining: (target.target_amount - achieved).max(Decimal::ZERO),
        projection,
    }
}

#[derive(Clone)]
pub struct FinanceService {
    repo: FinanceRepository,
}

impl FinanceService {
    pub fn new(repo: FinanceRepository) -> Self {
        Self { repo }
    }

    pub async fn create_category<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        payload: &ExpenseCategoryPayload,
    ) -> Result<ExpenseCategory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.create_category(executor, tenant_id, payload).await
    }

    pub async fn list_categories<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<ExpenseCategory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_categories(executor, tenant_id).await
    }

    pub async fn create_payable(&self, conn: &mut PgConnection, tenant_id: Uuid, payload: &PayablePayload) -> Result<Payable, AppError> {

        if !self.repo.category_exists(&mut *conn, tenant_id, payload.category_id).await? {
            return Err(AppError::ResourceNotFound("Categoria de despesa".into()));
        }
        self.repo.create_payable(&mut *conn, tenant_id, payload).await
    }

    pub async fn list_payables<'e, E>(&self, executor: E, tenant_id: Uuid, query: &PayableQuery) -> Result<Vec<PayableView>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let today = Utc::now().date_naive();
        let rows = self
            .repo
            .list_payables(executor, tenant_id, query.status, query.from, query.to)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| PayableView {
                overdue: row.payable.is_overdue(today),
                payable: row.payable,
                category_name: row.category_name,
            })
            .filter(|view| query.overdue.map_or(true, |wanted| view.overdue == wanted))
            .collect())
    }

    pub async fn pay(&self, conn: &mut PgConnection, tenant_id: Uuid, payable_id: Uuid, payload: &PayPayload) -> Result<Payable, AppError> {
        let mut tx = conn.begin().await?;

        let payable = self
            .repo
            .find_payable_for_update(&mut *tx, tenant_id, payable_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Conta a pagar".into()))?;

        let (balance, status) = apply_payment(&payable, payload.amount)?;
        let paid_at = payload.paid_at.unwrap_or_else(|| Utc::now().date_naive());

        let updated = self
            .repo
            .update_payment(&mut *tx, tenant_id, payable_id, balance, status, Some(paid_at))
            .await?;
        tx.commit().await?;

        tracing::info!(%tenant_id, %payable_id, status = status.as_str(), "Pagamento registrado");
        Ok(updated)
    }

    pub async fn cancel_payable(&self, conn: &mut PgConnection, tenant_id: Uuid, payable_id: Uuid) -> Result<Payable, AppError> {
        let mut tx = conn.begin().await?;

        let payable = self
            .repo
            .find_payable_for_update(&mut *tx, tenant_id, payable_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Conta a pagar".into()))?;

        if !payable.status.is_open() {
            return Err(AppError::InvalidStatusTransition {
                from: payable.status.as_str().to_string(),
                to: PayableStatus::Cancelled.as_str().to_string(),
            });
        }

        let updated = self
            .repo
            .update_payment(&mut *tx, tenant_id, payable_id, payable.balance, PayableStatus::Cancelled, payable.paid_at)
            .await?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn dre(&self, conn: &mut PgConnection, tenant_id: Uuid, query: &DreQuery) -> Result<DreReport, AppError> {
        if query.from > query.to {
            return Err(field_error("to", "range", "O fim do período é anterior ao início."));
        }
        let sales = self.repo.sales_totals(&mut *conn, tenant_id, query.from, query.to).await?;
        let expenses = self.repo.expense_totals(&mut *conn, tenant_id, query.from, query.to).await?;

        Ok(build_dre(query.from, query.to, &sales, &expenses))
    }

    pub async fn create_target<'e, E>(&self, executor: E, tenant_id: Uuid, payload: &TargetPayload) -> Result<SalesTarget, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.create_target(executor, tenant_id, payload).await
    }

    pub async fn list_targets<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        year: Option<i32>,
        month: Option<i32>,
    ) -> Result<Vec<SalesTarget>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_targets(executor, tenant_id, year, month).await
    }

    pub async fn targets_progress(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        year: i32,
        month: i32,
    ) -> Result<Vec<TargetProgress>, AppError> {
        self.progress_for_month(&mut *conn, tenant_id, year, month).await
    }

    pub(crate) async fn progress_for_month(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        year: i32,
        month: i32,
    ) -> Result<Vec<TargetProgress>, AppError> {
        let (first, last) = u32::try_from(month)
            .ok()
            .and_then(|m| month_bounds(year, m))
            .ok_or_else(|| field_error("month", "range", "Mês inválido."))?;

        let today = Utc::now().date_naive();
        let targets = self.repo.list_targets(&mut *conn, tenant_id, Some(year), Some(month)).await?;

        let mut progress = Vec::with_capacity(targets.len());
        for target in &targets {
            let achieved = self
                .repo
                .achieved_sales(&mut *conn, tenant_id, target.location_id, first, last)
                .await?;
            progress.push(target_progress(target, achieved, today));
        }
        Ok(progress)
    }

    pub(crate) fn repo(&self) -> &FinanceRepository {
        &self.repo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::finance::ExpenseGroup;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn payable(amount: &str, balance: &str, status: PayableStatus) -> Payable {
        Payable {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            category_id: Uuid::nil(),
            supplier_id: None,
            purchase_order_id: None,
            description: "Aluguel".into(),
            amount: dec(amount),
            balance: dec(balance),
            due_date: date(2025, 3, 10),
            competence_date: date(2025, 3, 1),
            status,
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn target(year: i32, month: i32, amount: &str) -> SalesTarget {
        SalesTarget {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            location_id: None,
            year,
            month,
            target_amount: dec(amount),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn partial_then_full_payment() {
        let p = payable("100", "100", PayableStatus::Pending);
        assert_eq!(apply_payment(&p, Some(dec("40"))).unwrap(), (dec("60"), PayableStatus::Partial));

        let p = payable("100", "60", PayableStatus::Partial);
        assert_eq!(apply_payment(&p, None).unwrap(), (Decimal::ZERO, PayableStatus::Paid));
    }

    #[test]
    fn payment_cannot_exceed_balance_or_touch_closed_payables() {
        let p = payable("100", "60", PayableStatus::Partial);
        assert!(matches!(apply_payment(&p, Some(dec("61"))), Err(AppError::ValidationError(_))));

        let paid = payable("100", "0", PayableStatus::Paid);
        assert!(matches!(apply_payment(&paid, None), Err(AppError::InvalidStatusTransition { .. })));
    }

    #[test]
    fn overdue_is_computed_at_read_time() {
        let p = payable("100", "100", PayableStatus::Pending);
        assert!(p.is_overdue(date(2025, 3, 11)));
        assert!(!p.is_overdue(date(2025, 3, 10)));
        assert!(!payable("100", "0", PayableStatus::Paid).is_overdue(date(2025, 4, 1)));
    }

    #[test]
    fn dre_lines_are_percentages_of_net_revenue() {
        let sales = SalesTotals {
            gross_revenue: dec("1100"),
            discounts: dec("100"),
            cost_of_goods_sold: dec("350"),
            sales_count: 42,
        };
        let expenses = vec![ExpenseTotal {
            category_id: Uuid::nil(),
            category_name: "Energia".into(),
            expense_group: ExpenseGroup::Operating,
            total: dec("150"),
        }];

        let dre = build_dre(date(2025, 3, 1), date(2025, 3, 31), &sales, &expenses);
        assert_eq!(dre.net_revenue.value, dec("1000"));
        assert_eq!(dre.net_revenue.percent, dec("100"));
        assert_eq!(dre.cost_of_goods_sold.percent, dec("35"));
        assert_eq!(dre.gross_profit.value, dec("650"));
        assert_eq!(dre.expenses[0].percent, dec("15"));
        assert_eq!(dre.operating_result.value, dec("500"));
        assert_eq!(dre.operating_result.percent, dec("50"));
    }

    #[test]
    fn dre_without_revenue_has_zero_percentages() {
        let dre = build_dre(date(2025, 3, 1), date(2025, 3, 31), &SalesTotals::default(), &[]);
        assert_eq!(dre.net_revenue.percent, Decimal::ZERO);
        assert_eq!(dre.operating_result.value, Decimal::ZERO);
    }

    #[test]
    fn month_bounds_handle_december_and_leap_years() {
        assert_eq!(month_bounds(2024, 2), Some((date(2024, 2, 1), date(2024, 2, 29))));
        assert_eq!(month_bounds(2025, 12), Some((date(2025, 12, 1), date(2025, 12, 31))));
        assert_eq!(month_bounds(2025, 13), None);
    }

    #[test]
    fn target_projection_is_linear_over_elapsed_days() {
        // 10 de abril (30 dias): R$ 20.000 realizados → projeção de R$ 60.000
        let progress = target_progress(&target(2025, 4, "50000"), dec("20000"), date(2025, 4, 10));
        assert_eq!(progress.percent, dec("40"));
        assert_eq!(progress.remaining, dec("30000"));
        assert_eq!(progress.projection, dec("60000"));
    }

    #[test]
    fn past_and_future_months() {
        let done = target_progress(&target(2025, 2, "1000"), dec("1200"), date(2025, 4, 1));
        assert_eq!(done.projection, dec("1200"));
        assert_eq!(done.remaining, Decimal::ZERO);

        let future = target_progress(&target(2025, 6, "1000"), Decimal::ZERO, date(2025, 4, 1));
        assert_eq!(future.projection, Decimal::ZERO);
    }
}

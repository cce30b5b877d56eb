mod commodity_feed;
mod commodity_pages;
mod dedupe;
mod home;
mod movie_detail;
mod movie_list;
mod report_detail;
mod report_list;
mod todo_list;

pub use commodity_feed::CommodityFeedView;
pub use commodity_pages::CommodityPagesView;
pub use dedupe::DedupeView;
pub use home::HomeView;
pub use movie_detail::MovieDetailView;
pub use movie_list::MovieListView;
pub use report_detail::ReportDetailView;
pub use report_list::ReportListView;
pub use todo_list::TodoListView;

use crate::app::Ctx;
use crate::ui::view::View;

/// Build the screen for a command name (see `commands::COMMANDS`).
/// `home` and `quit` are handled by the app itself.
pub fn view_for_command(name: &str, ctx: &Ctx) -> Option<Box<dyn View>> {
  match name {
    "movies" => Some(Box::new(MovieListView::new(ctx.clone()))),
    "todos" => Some(Box::new(TodoListView::new(ctx.clone()))),
    "commodities" => Some(Box::new(CommodityPagesView::new(ctx.clone()))),
    "feed" => Some(Box::new(CommodityFeedView::new(ctx.clone()))),
    "reports" => Some(Box::new(ReportListView::new(ctx.clone()))),
    "dedupe" => Some(Box::new(DedupeView::new(ctx.clone()))),
    _ => None,
  }
}

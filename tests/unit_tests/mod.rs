mod element;
mod reorder;
